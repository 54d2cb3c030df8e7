/*!
 * Process Module
 * Child outcomes, the executor seam and supervision
 */

pub mod executor;
/// In-memory executor for exercising the batching engine without forking
#[doc(hidden)]
pub mod recording;
pub mod supervisor;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use executor::ForkExecutor;
#[doc(hidden)]
pub use recording::{RecordedLaunch, RecordingExecutor};
pub use supervisor::{Supervisor, Verdict};
pub use traits::{Executor, LaunchRequest};
pub use types::{ChildOutcome, WaitPolicy};
