pub mod message;
pub mod receiver;
pub mod transmitter;

pub use message::{DisplayableError, WorkerMessage};
pub use receiver::{find_receiver, run_worker, FullRepairReceiver, Receiver};
pub use transmitter::Transmitter;
