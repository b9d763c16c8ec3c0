use sea_orm::sea_query::Expr;

use crate::{entity::game, prelude::*};

pub struct Game<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Game<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    place_id: i64,
    name: &str,
    script_url: &str,
  ) -> Result<game::Model> {
    let game = game::ActiveModel {
      id: NotSet,
      place_id: Set(place_id),
      name: Set(name.to_string()),
      script_url: Set(script_url.to_string()),
      script_version: Set(String::from("1.0.0")),
      min_key_tier: Set(None),
      is_active: Set(true),
      total_executions: Set(0),
      created_at: Set(Utc::now().naive_utc()),
    };

    Ok(game.insert(self.db).await?)
  }

  /// Only active games are visible to clients.
  pub async fn active_by_place(
    &self,
    place_id: i64,
  ) -> Result<Option<game::Model>> {
    let game = game::Entity::find()
      .filter(game::Column::PlaceId.eq(place_id))
      .filter(game::Column::IsActive.eq(true))
      .one(self.db)
      .await?;
    Ok(game)
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<game::Model>> {
    Ok(game::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn set_active(&self, id: i32, active: bool) -> Result<()> {
    let game = self.by_id(id).await?.ok_or(Error::GameNotFound)?;
    game::ActiveModel { is_active: Set(active), ..game.into() }
      .update(self.db)
      .await?;
    Ok(())
  }

  pub async fn increment_executions(&self, id: i32) -> Result<()> {
    game::Entity::update_many()
      .col_expr(
        game::Column::TotalExecutions,
        Expr::col(game::Column::TotalExecutions).add(1),
      )
      .filter(game::Column::Id.eq(id))
      .exec(self.db)
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  #[tokio::test]
  async fn test_inactive_game_is_hidden() {
    let db = test_db::setup().await;
    let sv = Game::new(&db);

    let game = sv.create(9999, "Arsenal", "https://cdn/arsenal.lua").await.unwrap();
    assert!(sv.active_by_place(9999).await.unwrap().is_some());

    sv.set_active(game.id, false).await.unwrap();
    assert!(sv.active_by_place(9999).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_increment_executions() {
    let db = test_db::setup().await;
    let sv = Game::new(&db);
    let game = sv.create(1, "Test", "https://cdn/t.lua").await.unwrap();

    sv.increment_executions(game.id).await.unwrap();
    sv.increment_executions(game.id).await.unwrap();

    let game = sv.by_id(game.id).await.unwrap().unwrap();
    assert_eq!(game.total_executions, 2);
  }
}
