use crate::{entity::user, prelude::*};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn get_or_create(
    &self,
    discord_id: &str,
    username: Option<&str>,
  ) -> Result<user::Model> {
    if let Some(user) = self.by_discord_id(discord_id).await? {
      return Ok(user);
    }

    let user = user::ActiveModel {
      id: NotSet,
      discord_id: Set(discord_id.to_string()),
      discord_username: Set(username.map(str::to_string)),
      is_banned: Set(false),
      ban_reason: Set(None),
      created_at: Set(Utc::now().naive_utc()),
    };

    Ok(user.insert(self.db).await?)
  }

  pub async fn by_discord_id(
    &self,
    discord_id: &str,
  ) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::DiscordId.eq(discord_id))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn set_banned(
    &self,
    discord_id: &str,
    banned: bool,
    reason: Option<String>,
  ) -> Result<user::Model> {
    let user =
      self.by_discord_id(discord_id).await?.ok_or(Error::UserNotFound)?;

    let updated = user::ActiveModel {
      is_banned: Set(banned),
      ban_reason: Set(if banned { reason } else { None }),
      ..user.into()
    }
    .update(self.db)
    .await?;

    Ok(updated)
  }
}
