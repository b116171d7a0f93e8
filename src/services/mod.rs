pub mod admission;
pub mod dropzone;
pub mod intake;
pub mod notifier;
pub mod preview;
pub mod progress;
pub mod staging;
