mod attachment;
mod notification;
mod report;

pub use attachment::*;
pub use notification::*;
pub use report::*;
