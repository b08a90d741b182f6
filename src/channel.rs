//! Same-document broadcast between the overlay and the page-side session.
//!
//! Every listener sees every post, its own included, the way `postMessage`
//! to the page window behaves. Nothing here is privileged: any page script
//! could listen in.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace};

use crate::model::WireMessage;

/// Where a post came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The page window both sides share.
    Page,
    /// Another frame or window. Ignored by listeners.
    Foreign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Origin,
    pub data: Value,
}

type Queue = Rc<RefCell<VecDeque<Envelope>>>;

#[derive(Clone, Default)]
pub struct PageChannel {
    listeners: Rc<RefCell<Vec<Weak<RefCell<VecDeque<Envelope>>>>>>,
}

impl PageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self) -> Listener {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.listeners.borrow_mut().push(Rc::downgrade(&queue));
        Listener { queue }
    }

    /// Deliver raw data to every live listener.
    pub fn post_raw(&self, origin: Origin, data: Value) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|w| w.strong_count() > 0);
        for queue in listeners.iter().filter_map(|w| w.upgrade()) {
            queue.borrow_mut().push_back(Envelope {
                origin,
                data: data.clone(),
            });
        }
    }

    pub fn post(&self, message: &WireMessage) {
        match serde_json::to_value(message) {
            Ok(data) => self.post_raw(Origin::Page, data),
            Err(err) => debug!(%err, "dropping unserializable message"),
        }
    }

    /// A posting handle that does not listen.
    pub fn poster(&self) -> Poster {
        Poster {
            channel: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Poster {
    channel: PageChannel,
}

impl Poster {
    pub fn post(&self, message: impl Into<WireMessage>) {
        self.channel.post(&message.into());
    }
}

pub struct Listener {
    queue: Queue,
}

impl Listener {
    pub fn recv_raw(&self) -> Option<Envelope> {
        self.queue.borrow_mut().pop_front()
    }

    /// Next well-formed message from this page, skipping anything else.
    pub fn recv(&self) -> Option<WireMessage> {
        while let Some(envelope) = self.recv_raw() {
            if envelope.origin != Origin::Page {
                trace!("ignoring message from another window");
                continue;
            }
            match serde_json::from_value::<WireMessage>(envelope.data) {
                Ok(message) => return Some(message),
                Err(err) => trace!(%err, "ignoring unrecognized message"),
            }
        }
        None
    }

    pub fn drain(&self) -> Vec<WireMessage> {
        std::iter::from_fn(|| self.recv()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
