pub mod beatmap;
pub mod cache;
pub mod catalog;
pub mod descriptor;
pub mod dispatcher;
pub mod duration;
pub mod environment;
pub mod error;
pub mod events;
pub mod hash;
pub mod host;
pub mod item;
pub mod loader;
pub mod probe;
pub mod scanner;
pub mod settings;

pub use catalog::{Pack, PackCollection};
pub use host::{HeadlessHost, Host};
pub use item::Item;
pub use probe::{DurationProbe, LoftyProbe};
pub use scanner::{LoadProgress, SongLoader};
pub use settings::Settings;
