//! Per-guild blacklist of users banned through `/smite`.
//!
//! The blacklist is kept in memory and written back to a single JSON file after
//! every change. The file holds one object: guild ids as string keys, arrays of
//! user ids as values.
//!
//! ```json
//! {
//!   "1090000000000000000": [1200000000000000000, 1200000000000000001]
//! }
//! ```
//!
//! This list is independent of Discord's own ban list. A user unbanned by hand
//! in the Discord UI is still on the blacklist until `/revive` is used.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use poise::serenity_prelude::{GuildId, UserId};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Error)]
pub enum BlacklistError {
    #[error("could not write blacklist to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize blacklist: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct Blacklist {
    path: PathBuf,
    pretty: bool,
    guilds: BTreeMap<String, Vec<u64>>,
}

impl Blacklist {
    /// An empty blacklist that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            path: path.into(),
            pretty,
            guilds: BTreeMap::new(),
        }
    }

    /// Reads the blacklist from `path`.
    ///
    /// A missing or unreadable file gives an empty blacklist; the problem is only logged.
    #[instrument]
    pub fn load(path: &Path, pretty: bool) -> Self {
        let mut blacklist = Self::new(path, pretty);

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("no blacklist found at {}, starting empty", path.display());
                return blacklist;
            }
            Err(e) => {
                warn!("could not read blacklist at {}: {e}, starting empty", path.display());
                return blacklist;
            }
        };

        match serde_json::from_str::<BTreeMap<String, Vec<u64>>>(&contents) {
            Ok(guilds) => {
                for (guild, users) in guilds {
                    let entry = blacklist.guilds.entry(guild).or_default();
                    for user in users {
                        if !entry.contains(&user) {
                            entry.push(user);
                        }
                    }
                }
                debug!(
                    "loaded {} blacklisted users in {} guilds",
                    blacklist.len(),
                    blacklist.guilds.len()
                );
            }
            Err(e) => {
                warn!("blacklist at {} is malformed: {e}, starting empty", path.display());
            }
        }

        blacklist
    }

    /// Overwrites the backing file with the full blacklist.
    pub fn save(&self) -> Result<(), BlacklistError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(&self.guilds)?
        } else {
            serde_json::to_string(&self.guilds)?
        };

        std::fs::write(&self.path, json).map_err(|source| BlacklistError::Io {
            path: self.path.clone(),
            source,
        })?;
        trace!("blacklist written to {}", self.path.display());

        Ok(())
    }

    pub fn contains(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.guilds
            .get(&guild_id.to_string())
            .is_some_and(|users| users.contains(&user_id.get()))
    }

    /// Returns `false` if the user was already blacklisted in this guild.
    /// The caller is responsible for calling [`Blacklist::save`].
    pub fn add(&mut self, guild_id: GuildId, user_id: UserId) -> bool {
        let users = self.guilds.entry(guild_id.to_string()).or_default();
        if users.contains(&user_id.get()) {
            return false;
        }
        users.push(user_id.get());

        true
    }

    /// Returns `false` if the user was not blacklisted in this guild.
    /// The guild keeps its (possibly empty) entry.
    /// The caller is responsible for calling [`Blacklist::save`].
    pub fn remove(&mut self, guild_id: GuildId, user_id: UserId) -> bool {
        self.take(guild_id, user_id).is_some()
    }

    /// Like [`Blacklist::remove`], but returns the position the user held so the
    /// removal can be undone with [`Blacklist::restore`].
    pub fn take(&mut self, guild_id: GuildId, user_id: UserId) -> Option<usize> {
        let users = self.guilds.get_mut(&guild_id.to_string())?;
        let index = users.iter().position(|id| *id == user_id.get())?;
        users.remove(index);

        Some(index)
    }

    /// Puts a user back at `index`, or at the end if the list got shorter.
    /// Returns `false` if the user is already blacklisted in this guild.
    pub fn restore(&mut self, guild_id: GuildId, user_id: UserId, index: usize) -> bool {
        let users = self.guilds.entry(guild_id.to_string()).or_default();
        if users.contains(&user_id.get()) {
            return false;
        }
        users.insert(index.min(users.len()), user_id.get());

        true
    }

    pub fn users(&self, guild_id: GuildId) -> &[u64] {
        self.guilds
            .get(&guild_id.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of blacklisted users over all guilds.
    pub fn len(&self) -> usize {
        self.guilds.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PartialEq for Blacklist {
    fn eq(&self, other: &Self) -> bool {
        self.guilds == other.guilds
    }
}
