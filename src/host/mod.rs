pub mod desktop;

pub use desktop::DesktopBroker;
