use std::io::Write;

use crate::error::ServeError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransactionState {
    Idle,
    BackedUp,
    Installed,
    Restored,
    Closed,
}

/// Appends `127.0.0.1 <hostname>` to the hosts file and takes it out again.
///
/// A full copy of the file is made before anything is written. Closing removes
/// every occurrence of the record instead of copying the backup back, so edits
/// made to the file in the meantime survive. The backup is only deleted once
/// the record is confirmed gone.
///
/// Dropping an installed transaction restores the file as well, errors are
/// then only logged: call [HostsFileTransaction::close] to get them.
#[derive(Debug)]
pub struct HostsFileTransaction {
    path: std::path::PathBuf,
    backup_path: std::path::PathBuf,
    record: String,
    state: TransactionState,
}

pub fn get_record(hostname: &str) -> String {
    format!("\n127.0.0.1\t{}\n", hostname)
}

/// `<hosts>.serve-mv.<unix micros>.bk`, next to the hosts file
pub fn get_backup_path(path: &std::path::Path) -> std::path::PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("hosts"));
    path.with_file_name(format!(
        "{}.serve-mv.{}.bk",
        file_name,
        chrono::Utc::now().timestamp_micros()
    ))
}

fn append_record(path: &std::path::Path, record: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(record)?;
    file.sync_all()
}

impl HostsFileTransaction {
    pub fn open(path: &std::path::Path, hostname: &str) -> Result<HostsFileTransaction, ServeError> {
        HostsFileTransaction::open_with_backup(path, get_backup_path(path), hostname)
    }

    pub fn open_with_backup<T>(
        path: &std::path::Path,
        backup_path: T,
        hostname: &str,
    ) -> Result<HostsFileTransaction, ServeError>
    where
        T: std::convert::Into<std::path::PathBuf>,
    {
        HostsFileTransaction::open_with_appender(path, backup_path, hostname, append_record)
    }

    /// Same as [HostsFileTransaction::open_with_backup], `append` writing the record
    pub fn open_with_appender<T, A>(
        path: &std::path::Path,
        backup_path: T,
        hostname: &str,
        append: A,
    ) -> Result<HostsFileTransaction, ServeError>
    where
        T: std::convert::Into<std::path::PathBuf>,
        A: FnOnce(&std::path::Path, &[u8]) -> std::io::Result<()>,
    {
        let mut transaction = HostsFileTransaction {
            path: path.to_path_buf(),
            backup_path: backup_path.into(),
            record: get_record(hostname),
            state: TransactionState::Idle,
        };
        transaction.backup()?;
        transaction.install(append)?;
        Ok(transaction)
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn backup_path(&self) -> &std::path::Path {
        &self.backup_path
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    fn backup(&mut self) -> Result<(), ServeError> {
        log::info!("Backing up {:?} to {:?}", self.path, self.backup_path);
        let copy = || -> std::io::Result<()> {
            let mut source = std::fs::File::open(&self.path)?;
            let mut backup = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.backup_path)?;
            std::io::copy(&mut source, &mut backup)?;
            backup.sync_all()
        };
        if let Err(source) = copy() {
            if source.kind() != std::io::ErrorKind::AlreadyExists && self.backup_path.exists() {
                let _ = std::fs::remove_file(&self.backup_path);
            }
            return Err(ServeError::HostsBackupFailed {
                path: self.path.clone(),
                backup: self.backup_path.clone(),
                source,
            });
        }
        self.state = TransactionState::BackedUp;
        Ok(())
    }

    fn install<A>(&mut self, append: A) -> Result<(), ServeError>
    where
        A: FnOnce(&std::path::Path, &[u8]) -> std::io::Result<()>,
    {
        log::info!("Adding in {:?}: {}", self.path, self.record.trim());
        if let Ok(content) = std::fs::read(&self.path) {
            if self.get_record_regex().is_match(&content) {
                log::warn!(
                    "{:?} already contains {}, it will be removed on exit",
                    self.path,
                    self.record.trim()
                );
            }
        }
        append(&self.path, self.record.as_bytes()).map_err(|source| {
            log::warn!("Keeping backup {:?}", self.backup_path);
            ServeError::HostsInstallFailed {
                path: self.path.clone(),
                source,
            }
        })?;
        self.state = TransactionState::Installed;
        Ok(())
    }

    fn get_record_regex(&self) -> regex::bytes::Regex {
        regex::bytes::Regex::new(&regex::escape(&self.record))
            .expect("An escaped record is always a valid pattern")
    }

    fn map_restore_error<T: std::fmt::Display>(&self, e: T) -> ServeError {
        ServeError::HostsRestoreFailed {
            path: self.path.clone(),
            backup: self.backup_path.clone(),
            reason: e.to_string(),
        }
    }

    fn restore(&mut self) -> Result<(), ServeError> {
        if self.state != TransactionState::Installed {
            return Ok(());
        }
        log::info!("Removing in {:?}: {}", self.path, self.record.trim());

        let record = self.get_record_regex();
        let content = std::fs::read(&self.path).map_err(|e| self.map_restore_error(e))?;
        if !record.is_match(&content) {
            log::warn!("{:?} no longer contains {}", self.path, self.record.trim());
        }
        let restored = record.replace_all(&content, &b""[..]);

        let write = || -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            file.write_all(&restored)?;
            file.sync_all()
        };
        write().map_err(|e| self.map_restore_error(e))?;

        let content = std::fs::read(&self.path).map_err(|e| self.map_restore_error(e))?;
        if record.is_match(&content) {
            return Err(self.map_restore_error("the record is still present"));
        }
        self.state = TransactionState::Restored;

        log::info!("Removing backup {:?}", self.backup_path);
        std::fs::remove_file(&self.backup_path).map_err(|e| self.map_restore_error(e))?;
        self.state = TransactionState::Closed;
        Ok(())
    }

    /// Takes the record out of the hosts file then deletes the backup.
    ///
    /// On error the backup stays where it is and nothing is retried on drop.
    pub fn close(mut self) -> Result<(), ServeError> {
        let result = self.restore();
        self.state = TransactionState::Closed;
        result
    }
}

impl Drop for HostsFileTransaction {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::error!("{}", e);
        }
    }
}
