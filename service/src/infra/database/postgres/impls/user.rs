//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, activation},
        User,
    },
    infra::{
        database::{self, Postgres},
        Database,
    },
};

impl Database<Select<By<Option<User>, user::Id>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, email, status, created_at, activated_at \
            FROM users \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| User {
                id: row.get("id"),
                email: row.get("email"),
                status: row.get("status"),
                created_at: row.get("created_at"),
                activated_at: row.get("activated_at"),
            }))
    }
}

impl Database<Select<By<Option<user::Status>, user::Id>>> for Postgres {
    type Ok = Option<user::Status>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<user::Status>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT status \
            FROM users \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| row.get("status")))
    }
}

impl
    Database<
        Update<
            By<activation::Transition, (user::Id, user::ActivationDateTime)>,
        >,
    > for Postgres
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

        // Single conditional statement, so concurrent attempts can't both
        // observe `PENDING`.
        const SQL: &str = "\
            WITH activated AS (\
                UPDATE users \
                SET status = $2::INT2, \
                    activated_at = $4::TIMESTAMPTZ \
                WHERE id = $1::UUID \
                      AND status = $3::INT2 \
                RETURNING id\
            ) \
            SELECT EXISTS (SELECT 1 FROM activated) AS activated, \
                   EXISTS (SELECT 1 FROM users WHERE id = $1::UUID) AS found";
        let row = self
            .query_opt(
                SQL,
                &[&id, &user::Status::Active, &user::Status::Pending, &at],
            )
            .await
            .map_err(tracerr::wrap!())?;
        let flags = row.map(|r| {
            (r.get::<_, bool>("activated"), r.get::<_, bool>("found"))
        });
        Ok(match flags {
            Some((true, _)) => activation::Transition::Activated,
            Some((false, true)) => activation::Transition::AlreadyActive,
            Some((false, false)) | None => activation::Transition::Missing,
        })
    }
}
