use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, GuildId, Http, HttpError, UserId, UserPagination};
use tracing::{debug, instrument, trace};

/// Page size for ban list requests; serenity caps the limit at `u8`.
const BAN_PAGE_SIZE: u8 = u8::MAX;

/// The result of a request to Discord, sorted into the cases the handlers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformOutcome<T = ()> {
    Ok(T),
    /// Unknown user, or (for unbans) the user is not banned.
    NotFound,
    /// The bot lacks the permission or role hierarchy to act on the target.
    Forbidden,
    Unknown(String),
}

impl<T> PlatformOutcome<T> {
    pub fn from_result(result: Result<T, serenity::Error>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(serenity::Error::Http(HttpError::UnsuccessfulRequest(response))) => {
                match response.status_code.as_u16() {
                    403 => Self::Forbidden,
                    404 => Self::NotFound,
                    _ => Self::Unknown(response.error.message),
                }
            }
            Err(e) => Self::Unknown(e.to_string()),
        }
    }
}

/// Moderation requests the bot sends to Discord.
#[async_trait]
pub trait Moderation: Send + Sync {
    async fn ban(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> PlatformOutcome;

    async fn unban(&self, guild_id: GuildId, user_id: UserId) -> PlatformOutcome;

    /// All users currently on the guild's ban list.
    async fn banned_users(&self, guild_id: GuildId) -> PlatformOutcome<Vec<UserId>>;
}

#[async_trait]
impl Moderation for Http {
    #[instrument(skip(self))]
    async fn ban(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> PlatformOutcome {
        let outcome =
            PlatformOutcome::from_result(guild_id.ban_with_reason(self, user_id, 0, reason).await);
        debug!("ban of {user_id} in {guild_id}: {outcome:?}");

        outcome
    }

    #[instrument(skip(self))]
    async fn unban(&self, guild_id: GuildId, user_id: UserId) -> PlatformOutcome {
        let outcome = PlatformOutcome::from_result(guild_id.unban(self, user_id).await);
        debug!("unban of {user_id} in {guild_id}: {outcome:?}");

        outcome
    }

    #[instrument(skip(self))]
    async fn banned_users(&self, guild_id: GuildId) -> PlatformOutcome<Vec<UserId>> {
        let mut users = vec![];
        let mut after = None;

        loop {
            let page = match guild_id
                .bans(self, after.map(UserPagination::After), Some(BAN_PAGE_SIZE))
                .await
            {
                Ok(page) => page,
                Err(e) => return PlatformOutcome::from_result(Err(e)),
            };
            trace!("fetched {} bans for {guild_id}", page.len());

            let full_page = page.len() >= BAN_PAGE_SIZE as usize;
            users.extend(page.into_iter().map(|ban| ban.user.id));

            match users.last() {
                Some(last) if full_page => after = Some(*last),
                _ => break,
            }
        }

        PlatformOutcome::Ok(users)
    }
}
