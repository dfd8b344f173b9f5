//! Daemon status.

use replication_config_and_utils::Paths;
use replication_message_store::{MessageStore, SqliteMessageStore};

/// Print the daemon PID and the content of the message store.
pub fn check_status(paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    match std::fs::read_to_string(paths.pid_file()) {
        Ok(pid) => println!("Daemon is running (PID {})", pid.trim()),
        Err(_) => println!("Daemon is not running (PID file not found)"),
    }

    let database = paths.database_file();
    if !database.exists() {
        println!("No message store at {}", database.display());
        return Ok(());
    }

    let store = SqliteMessageStore::open(&database)?;
    println!("  Store:   {}", database.display());
    println!("  Pending: {} message(s)", store.count()?);
    for (target, count) in store.count_by_target()? {
        println!("    {}: {}", target, count);
    }

    Ok(())
}
