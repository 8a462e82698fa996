mod nats;

pub use nats::{connect, NatsSubscriber};
