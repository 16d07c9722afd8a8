// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MySQL-backed [`Directory`]. Every operation absorbs connection and
//! query errors into the documented safe default, logging once via
//! `tracing` rather than propagating — a directory hiccup must never
//! crash the session FSM (§7).

use std::sync::Mutex;

use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder};

use crate::card::{CardKind, Uid};
use crate::config::DbConfig;
use crate::error::BoxError;

use super::{Directory, Profile, User};

pub struct MysqlDirectory {
    opts: Opts,
    persistent: Option<Mutex<Option<Conn>>>,
}

impl MysqlDirectory {
    /// Opens (and, if `use_persistent_connection`, keeps) a connection
    /// per `config`. Fails fast only if a persistent connection cannot
    /// be established at startup — the FSM has nothing useful to do
    /// without a directory.
    pub fn new(config: &DbConfig) -> Result<Self, BoxError> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()))
            .tcp_port(config.port.unwrap_or(3306));
        let opts: Opts = opts.into();

        let persistent = if config.use_persistent_connection {
            let conn = Conn::new(opts.clone()).map_err(|e| BoxError::Directory(e.to_string()))?;
            Some(Mutex::new(Some(conn)))
        } else {
            None
        };

        Ok(Self { opts, persistent })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Conn) -> mysql::Result<T>) -> Option<T> {
        match &self.persistent {
            Some(slot) => {
                let mut guard = match slot.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let needs_reconnect = match guard.as_mut() {
                    Some(conn) => !conn.ping(),
                    None => true,
                };
                if needs_reconnect {
                    match Conn::new(self.opts.clone()) {
                        Ok(conn) => *guard = Some(conn),
                        Err(e) => {
                            tracing::error!(error = %e, "failed to reconnect to directory");
                            return None;
                        }
                    }
                }
                let conn = guard.as_mut()?;
                run_and_log(f, conn)
            }
            None => match Conn::new(self.opts.clone()) {
                Ok(mut conn) => run_and_log(f, &mut conn),
                Err(e) => {
                    tracing::error!(error = %e, "failed to open directory connection");
                    None
                }
            },
        }
    }
}

fn run_and_log<T>(f: impl FnOnce(&mut Conn) -> mysql::Result<T>, conn: &mut Conn) -> Option<T> {
    match f(conn) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "directory query failed");
            None
        }
    }
}

impl Directory for MysqlDirectory {
    fn is_registered(&self, mac: &str) -> bool {
        self.with_conn(|conn| {
            let count: Option<i64> = conn.exec_first("SELECT count(id) FROM equipment WHERE mac_address = ?", (mac,))?;
            Ok(count.unwrap_or(0) > 0)
        })
        .unwrap_or(false)
    }

    fn register(&self, mac: &str) -> bool {
        self.with_conn(|conn| {
            conn.exec_drop(
                "INSERT INTO equipment (name, type_id, mac_address, location_id) VALUES ('New Portal Box', 1, ?, 1)",
                (mac,),
            )?;
            Ok(conn.affected_rows() == 1)
        })
        .unwrap_or(false)
    }

    fn get_equipment_profile(&self, mac: &str) -> Option<Profile> {
        self.with_conn(|conn| {
            let row: Option<(i64, i64, String, i64, String, u32)> = conn.exec_first(
                "SELECT e.id, e.type_id, t.name, e.location_id, l.name, e.timeout \
                 FROM equipment AS e \
                 INNER JOIN equipment_types AS t ON e.type_id = t.id \
                 INNER JOIN locations AS l ON e.location_id = l.id \
                 WHERE e.mac_address = ?",
                (mac,),
            )?;
            Ok(row)
        })
        .flatten()
        .map(|(equipment_id, equipment_type_id, equipment_type, location_id, location, timeout_minutes)| Profile {
            equipment_id,
            equipment_type_id,
            equipment_type,
            location_id,
            location,
            timeout_minutes,
        })
    }

    fn log_started(&self, equipment_id: i64) {
        let _ = self.with_conn(|conn| {
            conn.exec_drop(
                "INSERT INTO log(event_type_id, equipment_id) \
                 (SELECT id, ? FROM event_types WHERE name = 'Startup Complete')",
                (equipment_id,),
            )
        });
    }

    fn log_shutdown(&self, equipment_id: i64, card_id: Option<Uid>) {
        let _ = self.with_conn(|conn| match card_id {
            Some(card_id) => conn.exec_drop(
                "INSERT INTO log(event_type_id, equipment_id, card_id) \
                 (SELECT id, ?, ? FROM event_types WHERE name = 'Planned Shutdown')",
                (equipment_id, card_id),
            ),
            None => conn.exec_drop(
                "INSERT INTO log(event_type_id, equipment_id) \
                 (SELECT id, ? FROM event_types WHERE name = 'Planned Shutdown')",
                (equipment_id,),
            ),
        });
    }

    fn log_access_attempt(&self, card_id: Uid, equipment_id: i64, successful: bool) {
        let _ = self.with_conn(|conn| conn.exec_drop("CALL log_access_attempt(?, ?, ?)", (successful, card_id, equipment_id)));
    }

    fn log_access_completion(&self, card_id: Uid, equipment_id: i64) {
        let _ = self.with_conn(|conn| conn.exec_drop("CALL log_access_completion(?, ?)", (card_id, equipment_id)));
    }

    fn get_card_type(&self, uid: Uid) -> CardKind {
        let type_id: Option<i64> = self
            .with_conn(|conn| conn.exec_first("SELECT type_id FROM cards WHERE id = ?", (uid,)))
            .flatten();
        CardKind::from_type_id(type_id.unwrap_or(-1))
    }

    fn is_training_card_for(&self, uid: Uid, equipment_type_id: i64) -> bool {
        self.with_conn(|conn| {
            let count: Option<i64> = conn.exec_first(
                "SELECT count(id) FROM equipment_type_x_cards WHERE card_id = ? AND equipment_type_id = ?",
                (uid, equipment_type_id),
            )?;
            Ok(count.unwrap_or(0) > 0)
        })
        .unwrap_or(false)
    }

    fn is_user_authorized(&self, card_id: Uid, equipment_type_id: i64) -> bool {
        self.with_conn(|conn| {
            let policy: Option<(bool, bool)> = conn.exec_first(
                "SELECT requires_training, charge_policy_id > 2 FROM equipment_types WHERE id = ?",
                (equipment_type_id,),
            )?;
            let Some((requires_training, requires_payment)) = policy else {
                return Ok(false);
            };

            // Preserves the known defect: this check is scoped to the
            // user's card, never to `equipment_type_id` — any payment by
            // this user authorizes payment-gated equipment of any type.
            let has_payment = |conn: &mut Conn| -> mysql::Result<bool> {
                let count: Option<i64> = conn.exec_first(
                    "SELECT count(p.id) FROM payments AS p \
                     INNER JOIN users_x_cards AS u ON u.user_id = p.user_id \
                     WHERE u.card_id = ?",
                    (card_id,),
                )?;
                Ok(count.unwrap_or(0) > 0)
            };
            let has_authorization = |conn: &mut Conn| -> mysql::Result<bool> {
                let count: Option<i64> = conn.exec_first(
                    "SELECT count(u.id) FROM users_x_cards AS u \
                     INNER JOIN authorizations AS a ON a.user_id = u.user_id \
                     WHERE u.card_id = ? AND a.equipment_type_id = ?",
                    (card_id, equipment_type_id),
                )?;
                Ok(count.unwrap_or(0) > 0)
            };

            let authorized = match (requires_training, requires_payment) {
                (true, true) => has_payment(conn)? && has_authorization(conn)?,
                (true, false) => has_authorization(conn)?,
                (false, true) => has_payment(conn)?,
                (false, false) => true,
            };
            Ok(authorized)
        })
        .unwrap_or(false)
    }

    fn is_user_trainer(&self, card_id: Uid) -> bool {
        self.with_conn(|conn| {
            let row: Option<(bool,)> = conn.exec_first(
                "SELECT u.is_trainer FROM users_x_cards AS c \
                 INNER JOIN users AS u ON u.id = c.user_id WHERE c.card_id = ?",
                (card_id,),
            )?;
            Ok(row.map(|(is_trainer,)| is_trainer).unwrap_or(false))
        })
        .unwrap_or(false)
    }

    fn get_user(&self, card_id: Uid) -> Option<User> {
        self.with_conn(|conn| {
            let row: Option<(String, String)> = conn.exec_first(
                "SELECT u.name, u.email FROM users_x_cards AS c \
                 JOIN users AS u ON u.id = c.user_id WHERE c.card_id = ?",
                (card_id,),
            )?;
            Ok(row)
        })
        .flatten()
        .map(|(name, email)| User { name, email })
    }
}
