use std::cell::RefCell;
use std::rc::Rc;

/// Single-threaded broadcast queue between DOM callbacks and the client loop.
pub type Bus<T> = Rc<BusInner<T>>;

pub struct BusInner<T> {
    rxers: RefCell<Vec<Receiver<T>>>,
}

pub fn create_bus<T>() -> Bus<T> {
    Rc::new(BusInner {
        rxers: RefCell::new(Vec::new()),
    })
}

impl<T> BusInner<T> {
    pub fn new_sender(self: &Rc<BusInner<T>>) -> Sender<T> {
        Sender {
            bus: self.clone()
        }
    }

    pub fn new_receiver(self: &Rc<BusInner<T>>) -> Receiver<T> {
        let rx = Rc::new(ReceiverInner {
            queue: RefCell::new(Vec::new()),
        });
        self.rxers.borrow_mut().push(rx.clone());
        rx
    }

    pub fn send(self: &Rc<BusInner<T>>, data: T) {
        let data = Rc::new(data);
        let rxers = self.rxers.borrow().clone();
        for rx in rxers {
            rx.queue.borrow_mut().push(data.clone());
        }
    }
}

pub struct Sender<T> {
    bus: Bus<T>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Sender { bus: self.bus.clone() }
    }
}

impl<T> Sender<T> {
    pub fn send(&self, data: T) {
        self.bus.send(data);
    }
}

pub type Receiver<T> = Rc<ReceiverInner<T>>;

pub struct ReceiverInner<T> {
    queue: RefCell<Vec<Rc<T>>>,
}

impl<T> ReceiverInner<T> {
    /// Takes every message queued since the last read.
    pub fn read(&self) -> Vec<Rc<T>> {
        self.queue.replace(Vec::new())
    }
}
