pub mod types;
pub mod traits;
pub mod aggregator;
pub mod channels;
pub mod source;
pub mod parser;
pub mod fetcher;
pub mod session;
pub mod render;
pub mod digest;
pub mod state;
pub mod utils;

pub use types::*;
pub use traits::{FeedRenderer, MessageSource};
pub use aggregator::{FeedAggregator, FeedItem, FeedSnapshot, DEFAULT_WINDOW_SIZE};
pub use fetcher::Fetcher;
pub use parser::EventStreamParser;
pub use session::{FeedOutcome, FeedSession, ScrapeStream, SessionState};
pub use render::{ProgressRenderer, TextRenderer};
pub use digest::{SidebarWidth, SummaryHistory};
pub use state::Dashboard;
