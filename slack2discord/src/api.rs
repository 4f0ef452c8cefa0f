pub mod discord;
pub mod dry_run;
pub mod files;
