//! `/smite` and `/revive` without the poise layer.
//!
//! Both handlers change the blacklist and write it to disk before talking to
//! Discord. If the write fails the in-memory change is undone and Discord is
//! not contacted. A failed Discord request does not undo the blacklist change;
//! the response tells the moderator what went wrong.

use std::fmt::Display;

use poise::serenity_prelude::{GuildId, Mentionable, UserId};
use tracing::{debug, error, info, warn};

use crate::{
    blacklist::{Blacklist, BlacklistError},
    config::UnbanStrategy,
    platform::{Moderation, PlatformOutcome},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmiteResponse {
    Smited(UserId),
    AlreadyBlacklisted,
    BanForbidden(UserId),
    BanFailed { user_id: UserId, reason: String },
}

impl Display for SmiteResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smited(user_id) => {
                write!(f, "\u{26a1} {} has been smited and banned!", user_id.mention())
            }
            Self::AlreadyBlacklisted => write!(f, "That user is already on the blacklist."),
            Self::BanForbidden(user_id) => write!(
                f,
                "{} was added to the blacklist, but I'm not allowed to ban them. Make sure my role is above theirs.",
                user_id.mention()
            ),
            Self::BanFailed { user_id, reason } => write!(
                f,
                "{} was added to the blacklist, but the ban failed: {reason}",
                user_id.mention()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviveResponse {
    InvalidUserId(String),
    NotBlacklisted,
    Revived(UserId),
    /// Off the blacklist, but Discord had no ban for this user.
    RemovedButNotBanned,
    UnbanForbidden(UserId),
    UnbanFailed { user_id: UserId, reason: String },
}

impl Display for ReviveResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUserId(input) => write!(f, "`{input}` is not a valid user id."),
            Self::NotBlacklisted => write!(f, "That user is not blacklisted."),
            Self::Revived(user_id) => {
                write!(f, "\u{2728} {} has been revived and unbanned!", user_id.mention())
            }
            Self::RemovedButNotBanned => {
                write!(f, "User was removed from blacklist but wasn't banned.")
            }
            Self::UnbanForbidden(user_id) => write!(
                f,
                "{} was removed from the blacklist, but I'm not allowed to unban them.",
                user_id.mention()
            ),
            Self::UnbanFailed { user_id, reason } => write!(
                f,
                "{} was removed from the blacklist, but the unban failed: {reason}",
                user_id.mention()
            ),
        }
    }
}

pub fn audit_reason(issuer: &str) -> String {
    format!("Smited by {issuer}")
}

/// Accepts a bare id or a user mention (`<@id>`, `<@!id>`).
pub fn parse_user_id(input: &str) -> Option<UserId> {
    let input = input.trim();
    let id = input
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(input);

    match id.parse::<u64>() {
        Ok(id) if id != 0 => Some(UserId::new(id)),
        _ => None,
    }
}

pub async fn smite<M>(
    blacklist: &mut Blacklist,
    platform: &M,
    guild_id: GuildId,
    user_id: UserId,
    issuer: &str,
) -> Result<SmiteResponse, BlacklistError>
where
    M: Moderation + ?Sized,
{
    if !blacklist.add(guild_id, user_id) {
        debug!("{user_id} already blacklisted in {guild_id}");
        return Ok(SmiteResponse::AlreadyBlacklisted);
    }
    if let Err(e) = blacklist.save() {
        error!("{e}, dropping {user_id} from the blacklist again");
        blacklist.remove(guild_id, user_id);
        return Err(e);
    }
    info!("{user_id} blacklisted in {guild_id} by {issuer}");

    let response = match platform.ban(guild_id, user_id, &audit_reason(issuer)).await {
        PlatformOutcome::Ok(()) => SmiteResponse::Smited(user_id),
        PlatformOutcome::Forbidden => {
            warn!("not allowed to ban {user_id} in {guild_id}, keeping blacklist entry");
            SmiteResponse::BanForbidden(user_id)
        }
        PlatformOutcome::NotFound => SmiteResponse::BanFailed {
            user_id,
            reason: String::from("Discord does not know this user"),
        },
        PlatformOutcome::Unknown(reason) => {
            error!("ban of {user_id} in {guild_id} failed: {reason}");
            SmiteResponse::BanFailed { user_id, reason }
        }
    };

    Ok(response)
}

pub async fn revive<M>(
    blacklist: &mut Blacklist,
    platform: &M,
    guild_id: GuildId,
    member_id: &str,
    strategy: UnbanStrategy,
) -> Result<ReviveResponse, BlacklistError>
where
    M: Moderation + ?Sized,
{
    let Some(user_id) = parse_user_id(member_id) else {
        return Ok(ReviveResponse::InvalidUserId(member_id.to_owned()));
    };

    let Some(index) = blacklist.take(guild_id, user_id) else {
        debug!("{user_id} not blacklisted in {guild_id}");
        return Ok(ReviveResponse::NotBlacklisted);
    };
    if let Err(e) = blacklist.save() {
        error!("{e}, putting {user_id} back on the blacklist");
        blacklist.restore(guild_id, user_id, index);
        return Err(e);
    }
    info!("{user_id} removed from blacklist in {guild_id}");

    if strategy == UnbanStrategy::SearchBanList {
        match platform.banned_users(guild_id).await {
            PlatformOutcome::Ok(banned) if banned.contains(&user_id) => {}
            PlatformOutcome::Ok(_) | PlatformOutcome::NotFound => {
                return Ok(ReviveResponse::RemovedButNotBanned)
            }
            PlatformOutcome::Forbidden => return Ok(ReviveResponse::UnbanForbidden(user_id)),
            PlatformOutcome::Unknown(reason) => {
                error!("could not fetch bans for {guild_id}: {reason}");
                return Ok(ReviveResponse::UnbanFailed { user_id, reason });
            }
        }
    }

    let response = match platform.unban(guild_id, user_id).await {
        PlatformOutcome::Ok(()) => ReviveResponse::Revived(user_id),
        PlatformOutcome::NotFound => ReviveResponse::RemovedButNotBanned,
        PlatformOutcome::Forbidden => {
            warn!("not allowed to unban {user_id} in {guild_id}");
            ReviveResponse::UnbanForbidden(user_id)
        }
        PlatformOutcome::Unknown(reason) => {
            error!("unban of {user_id} in {guild_id} failed: {reason}");
            ReviveResponse::UnbanFailed { user_id, reason }
        }
    };

    Ok(response)
}
