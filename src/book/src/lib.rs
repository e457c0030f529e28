mod levels;
mod notifier;
mod state;

pub use levels::PriceLevelMap;
pub use notifier::ChangeNotifier;
pub use state::{ListenerState, OrderBookState};
