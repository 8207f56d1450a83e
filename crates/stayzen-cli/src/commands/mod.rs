pub mod agent;
pub mod block;
pub mod daemon;
pub mod events;
pub mod helpers;
pub mod pomodoro;
pub mod settings;
pub mod stats;
pub mod timers;
