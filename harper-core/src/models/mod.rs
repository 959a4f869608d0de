pub mod exchange;
pub mod history;
pub mod session;

pub use exchange::Exchange;
pub use history::{HistoryTurn, Role};
pub use session::SessionId;
