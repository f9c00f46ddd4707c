pub mod archive;
pub mod audit;
pub mod browse;
pub mod config;
pub mod folders;
pub mod layout;
pub mod ledger;
pub mod normalize;
pub mod paths;
pub mod relpath;
pub mod restore;
pub mod session;
pub mod settings;
pub mod site;
pub mod snapshot;
pub mod store;
pub mod util;
pub mod warn;
