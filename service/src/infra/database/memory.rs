//! In-memory [`Database`] implementation.

use std::{collections::HashMap, sync::Arc};

use common::operations::{By, Insert, Select, Update};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, activation},
        User,
    },
    infra::{database, Database},
};

/// In-memory [`Database`] of [`User`]s.
///
/// Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`User`]s.
    users: Arc<RwLock<HashMap<user::Id, User>>>,
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.users.write().await.insert(user.id, user));
        Ok(())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.users.read().await.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<user::Status>, user::Id>>> for Memory {
    type Ok = Option<user::Status>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<user::Status>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .users
            .read()
            .await
            .get(&by.into_inner())
            .map(|u| u.status))
    }
}

impl
    Database<
        Update<
            By<activation::Transition, (user::Id, user::ActivationDateTime)>,
        >,
    > for Memory
{
    type Ok = activation::Transition;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<
            By<activation::Transition, (user::Id, user::ActivationDateTime)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, at) = by.into_inner();

        // Check and set under the same write guard.
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(user) if user.status == user::Status::Pending => {
                user.status = user::Status::Active;
                user.activated_at = Some(at);
                activation::Transition::Activated
            }
            Some(_) => activation::Transition::AlreadyActive,
            None => activation::Transition::Missing,
        })
    }
}
