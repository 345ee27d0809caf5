//! Backend commands queued from UI to backend worker.

use shared::operation::AtmOperation;

pub enum BackendCommand {
    DetectBridge,
    Connect,
    Submit { operation: AtmOperation },
}
