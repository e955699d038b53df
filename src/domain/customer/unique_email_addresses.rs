use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::error::{Error, Result};
use super::events::CustomerEvent;
use super::value_objects::{CustomerId, EmailAddress};

// ============================================================================
// Unique Email Addresses - Uniqueness Ledger
// ============================================================================
//
// One row per email address currently in use, keyed by the address. The
// rows are maintained from the events a command records and are written in
// the same transaction as those events.
//
// ============================================================================

/// A single ledger mutation derived from a recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAssertion {
    Claim { email_address: EmailAddress, customer_id: CustomerId },
    Release { email_address: EmailAddress, customer_id: CustomerId },
}

/// Ledger mutations implied by recorded events, in order
pub fn assertions_for(events: &[CustomerEvent]) -> Vec<LedgerAssertion> {
    let mut assertions = Vec::new();

    for event in events {
        match event {
            CustomerEvent::Registered(e) => assertions.push(LedgerAssertion::Claim {
                email_address: e.email_address.clone(),
                customer_id: e.customer_id.clone(),
            }),
            CustomerEvent::EmailAddressChanged(e) => {
                assertions.push(LedgerAssertion::Release {
                    email_address: e.previous_email_address.clone(),
                    customer_id: e.customer_id.clone(),
                });
                assertions.push(LedgerAssertion::Claim {
                    email_address: e.email_address.clone(),
                    customer_id: e.customer_id.clone(),
                });
            }
            CustomerEvent::Deleted(e) => assertions.push(LedgerAssertion::Release {
                email_address: e.email_address.clone(),
                customer_id: e.customer_id.clone(),
            }),
            CustomerEvent::EmailAddressConfirmed(_)
            | CustomerEvent::EmailAddressConfirmationFailed(_)
            | CustomerEvent::NameChanged(_) => {}
        }
    }

    assertions
}

#[derive(Debug, Clone)]
pub struct UniqueEmailAddresses {
    table: String,
}

impl UniqueEmailAddresses {
    pub fn new(table: &str) -> Self {
        Self { table: table.to_string() }
    }

    pub async fn init_schema(&self, pool: &SqlitePool) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                email_address TEXT NOT NULL PRIMARY KEY,
                customer_id TEXT NOT NULL
            )",
            self.table
        );

        sqlx::query(&ddl).execute(pool).await?;
        Ok(())
    }

    /// Apply the mutations for `events` on the transaction's connection
    pub async fn assert_for(
        &self,
        conn: &mut SqliteConnection,
        events: &[CustomerEvent],
    ) -> Result<()> {
        for assertion in assertions_for(events) {
            match assertion {
                LedgerAssertion::Claim { email_address, customer_id } => {
                    self.claim(conn, &email_address, &customer_id).await?
                }
                LedgerAssertion::Release { email_address, customer_id } => {
                    self.release(conn, &email_address, &customer_id).await?
                }
            }
        }
        Ok(())
    }

    /// Claim an address; claiming one's own address again is a no-op
    pub async fn claim(
        &self,
        conn: &mut SqliteConnection,
        email_address: &EmailAddress,
        customer_id: &CustomerId,
    ) -> Result<()> {
        let insert = format!(
            "INSERT INTO {} (email_address, customer_id) VALUES (?, ?)",
            self.table
        );

        let inserted = sqlx::query(&insert)
            .bind(email_address.as_str())
            .bind(customer_id.as_str())
            .execute(&mut *conn)
            .await;

        match inserted {
            Ok(_) => {
                tracing::debug!(
                    email_address = %email_address,
                    customer_id = %customer_id,
                    "Claimed email address"
                );
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let owner = self.owner_of(conn, email_address).await?;
                if owner.as_deref() == Some(customer_id.as_str()) {
                    return Ok(());
                }
                Err(Error::Duplicate(format!("email address [{email_address}] is already in use")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Release an address held by `customer_id`; releasing twice is fine
    pub async fn release(
        &self,
        conn: &mut SqliteConnection,
        email_address: &EmailAddress,
        customer_id: &CustomerId,
    ) -> Result<()> {
        let delete = format!(
            "DELETE FROM {} WHERE email_address = ? AND customer_id = ?",
            self.table
        );

        let result = sqlx::query(&delete)
            .bind(email_address.as_str())
            .bind(customer_id.as_str())
            .execute(&mut *conn)
            .await?;

        tracing::debug!(
            email_address = %email_address,
            customer_id = %customer_id,
            released = result.rows_affected(),
            "Released email address"
        );

        Ok(())
    }

    pub async fn release_all_for(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &CustomerId,
    ) -> Result<()> {
        let delete = format!("DELETE FROM {} WHERE customer_id = ?", self.table);

        sqlx::query(&delete)
            .bind(customer_id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn owner_of(
        &self,
        conn: &mut SqliteConnection,
        email_address: &EmailAddress,
    ) -> Result<Option<String>> {
        let query = format!("SELECT customer_id FROM {} WHERE email_address = ?", self.table);

        let row = sqlx::query(&query)
            .bind(email_address.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(|r| r.try_get::<String, _>("customer_id")).transpose().map_err(Error::from)
    }
}
