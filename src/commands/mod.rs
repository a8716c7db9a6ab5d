pub mod helpers;
pub mod hint;
pub mod install;
pub mod latest;
pub mod list;
pub mod methods;
pub mod uninstall;
pub mod update;
pub mod version;
