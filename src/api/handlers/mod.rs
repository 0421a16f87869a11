//! API request handlers.

mod bulk;
mod feedback;
mod health;
mod intelligence;
mod notices;

pub use bulk::{batch_status_handler, cancel_batch_handler, process_queue_handler, submit_batch_handler};
pub use feedback::{reject_infringement_handler, verify_infringement_handler};
pub use health::health_handler;
pub use intelligence::{filter_results_handler, product_intelligence_handler, refresh_keywords_handler};
pub use notices::generate_notice_handler;
