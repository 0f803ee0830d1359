pub mod login_state_sweep;

pub use login_state_sweep::LoginStateSweepWorker;
