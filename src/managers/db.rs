use async_trait::async_trait;
use poise::serenity_prelude::MessageId;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    menus::{ConfigStore, MenuConfigRecord, MenuError},
    tokens::{self, SurrealDbSignInInfo},
    Error,
};

const MENU_TABLE: &str = "reaction_menu";
static NULL: Value = Value::Null;

pub struct SurrealClient {
    client: Client,
    sign_in_info: SurrealDbSignInInfo,
}

pub trait OptionOrVec {
    fn is_option() -> bool;
}

impl<T> OptionOrVec for Option<T> {
    fn is_option() -> bool {
        true
    }
}
impl<T> OptionOrVec for Vec<T> {
    fn is_option() -> bool {
        false
    }
}

#[derive(Deserialize)]
pub struct DbResponse {
    pub result: Value,
    pub status: String,
    pub time: String,
}

#[derive(Deserialize)]
pub struct DbError {
    pub code: u16,
    pub details: String,
    pub description: String,
    pub information: String,
}

pub struct Responses(Vec<DbResponse>);

impl Responses {
    /// Takes and parses response from Vec.
    ///
    /// Returns error if failed to deserialize or if response isn't OK.
    pub fn take<T: OptionOrVec + DeserializeOwned>(&self, index: usize) -> Result<T, Error> {
        if let Some(err) = self.take_err(index) {
            return Err(err);
        }

        let response = &self.0[index];

        let deserialize_value = if T::is_option() {
            value_option_fixer(&response.result)?
        } else {
            &response.result
        };

        let deserialized = serde_json::from_value::<T>(deserialize_value.clone())?;

        Ok(deserialized)
    }

    pub fn take_err(&self, index: usize) -> Option<Error> {
        let Some(response) = self.0.get(index) else {
            return Some("Index too high.".into());
        };

        if response.status != "OK" {
            let Some(result) = response.result.as_str() else {
                return Some("Database response status isn't OK.".into());
            };
            return Some(remove_prefix(result, "An error occurred: ").into());
        }

        None
    }
}

fn remove_prefix(string: &str, prefix: &str) -> String {
    string.strip_prefix(prefix).unwrap_or(string).to_string()
}

/// Connects using the sign in info in `./surrealdb_signin.json`.
pub fn new_db() -> Result<SurrealClient, Error> {
    Ok(SurrealClient::new(tokens::get_surreal_signin_info()?))
}

impl SurrealClient {
    pub fn new(sign_in_info: SurrealDbSignInInfo) -> Self {
        let client = reqwest::Client::new();
        Self {
            client,
            sign_in_info,
        }
    }

    /// Creates the RequestBuilder with the url, auth and headers already setup.
    pub fn create_builder(&self) -> RequestBuilder {
        let sign_in = &self.sign_in_info;
        self.client
            .post(format!("{}/sql", &sign_in.address))
            .basic_auth(&sign_in.username, Some(&sign_in.password))
            .header("Accept", "application/json")
            .header("NS", &sign_in.namespace)
            .header("DB", &sign_in.database)
    }

    /// Sends query to database and returns the result.
    ///
    /// Errors if database is offline or if address is invalid.
    pub async fn query<S: Into<String>>(&self, query: S) -> Result<Responses, Error> {
        let query: String = query.into();
        let builder = self.create_builder().body(query.clone());

        let built_request = match builder.build() {
            Ok(request) => request,
            Err(err) => {
                error!("{err}");
                return Err("Failed to build request to database.".into());
            }
        };
        let response = match self.client.execute(built_request).await {
            Ok(response) => response,
            Err(err) => {
                error!("{err}");
                return Err("Failed to execute request to database.".into());
            }
        };

        if !response.status().is_success() {
            debug!("Failed query: {query}");
            match response.json::<DbError>().await {
                Ok(ok_err) => {
                    error!("{}", ok_err.information);
                    return Err(format!(
                        "Database failed to understand query. {}, {}",
                        ok_err.details, ok_err.description
                    )
                    .into());
                }
                Err(err) => {
                    return Err(format!(
                        "Database failed to understand query. Failed to parse error. {}",
                        err
                    )
                    .into())
                }
            }
        }

        let db_responses = response.json::<Vec<DbResponse>>().await?;

        Ok(Responses(db_responses))
    }
}

/// Returns value that can be deserialized using Option<T>.
/// Only does something if value is an array.
///
/// Errors if array has more than 1 element.
pub fn value_option_fixer(value: &Value) -> Result<&Value, Error> {
    let Some(array) = value.as_array() else {
        return Ok(value);
    };

    match array.len() {
        0 => Ok(&NULL),
        1 => Ok(&array[0]),
        _ => Err("Couldn't parse Vec into Option because it has more than 1 elements.".into()),
    }
}

fn store_error(err: Error) -> MenuError {
    MenuError::Store(err.to_string())
}

impl SurrealClient {
    pub async fn get_menu(&self, menu_id: MessageId) -> Result<Option<MenuConfigRecord>, Error> {
        let record = self
            .query(format!("SELECT menu_id, serialized_menu_json FROM {MENU_TABLE}:{menu_id};"))
            .await?
            .take(0)?;

        Ok(record)
    }

    pub async fn list_menus(&self) -> Result<Vec<MenuConfigRecord>, Error> {
        let records = self
            .query(format!("SELECT menu_id, serialized_menu_json FROM {MENU_TABLE};"))
            .await?
            .take(0)?;

        Ok(records)
    }

    pub async fn create_menu(&self, record: &MenuConfigRecord) -> Result<(), Error> {
        let record_json = serde_json::to_string(record)?;
        let menu_id = record.menu_id;

        let res = self
            .query(format!("CREATE {MENU_TABLE}:{menu_id} CONTENT {record_json};"))
            .await?;

        if let Some(err) = res.take_err(0) {
            return Err(err);
        }
        Ok(())
    }

    pub async fn update_menu(&self, record: &MenuConfigRecord) -> Result<(), Error> {
        let record_json = serde_json::to_string(record)?;
        let menu_id = record.menu_id;

        let res = self
            .query(format!("UPDATE {MENU_TABLE}:{menu_id} CONTENT {record_json};"))
            .await?;

        if let Some(err) = res.take_err(0) {
            return Err(err);
        }
        Ok(())
    }

    pub async fn delete_menu(&self, menu_id: MessageId) -> Result<(), Error> {
        let res = self.query(format!("DELETE {MENU_TABLE}:{menu_id};")).await?;

        if let Some(err) = res.take_err(0) {
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SurrealClient {
    async fn get(&self, menu_id: MessageId) -> Result<Option<MenuConfigRecord>, MenuError> {
        self.get_menu(menu_id).await.map_err(store_error)
    }

    async fn list(&self) -> Result<Vec<MenuConfigRecord>, MenuError> {
        self.list_menus().await.map_err(store_error)
    }

    async fn create(&self, record: MenuConfigRecord) -> Result<(), MenuError> {
        self.create_menu(&record).await.map_err(store_error)
    }

    async fn update(&self, record: MenuConfigRecord) -> Result<(), MenuError> {
        self.update_menu(&record).await.map_err(store_error)
    }

    async fn delete(&self, menu_id: MessageId) -> Result<(), MenuError> {
        self.delete_menu(menu_id).await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn responses(responses: Vec<Value>) -> Responses {
        Responses(
            responses
                .into_iter()
                .map(|response| serde_json::from_value(response).unwrap())
                .collect(),
        )
    }

    #[test]
    fn take_single_record() {
        let res = responses(vec![json!({
            "result": [{"id": "reaction_menu:5", "menu_id": 5, "serialized_menu_json": "{}"}],
            "status": "OK",
            "time": "1ms",
        })]);

        let record: Option<MenuConfigRecord> = res.take(0).unwrap();
        assert_eq!(
            record,
            Some(MenuConfigRecord {
                menu_id: 5,
                serialized_menu_json: "{}".to_string(),
            })
        );
    }

    #[test]
    fn empty_result_is_none() {
        let res = responses(vec![json!({"result": [], "status": "OK", "time": "1ms"})]);
        let record: Option<MenuConfigRecord> = res.take(0).unwrap();
        assert_eq!(record, None);

        let records: Vec<MenuConfigRecord> = res.take(0).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn errors_lose_their_prefix() {
        let res = responses(vec![json!({
            "result": "An error occurred: Database record `reaction_menu:5` already exists",
            "status": "ERR",
            "time": "1ms",
        })]);

        let err = res.take_err(0).unwrap();
        assert_eq!(err.to_string(), "Database record `reaction_menu:5` already exists");
        assert!(res.take::<Option<MenuConfigRecord>>(0).is_err());
        assert!(res.take_err(3).is_some());
    }

    #[test]
    fn option_fixer_rejects_many() {
        assert_eq!(value_option_fixer(&json!([1])).unwrap(), &json!(1));
        assert_eq!(value_option_fixer(&json!({"a": 1})).unwrap(), &json!({"a": 1}));
        assert!(value_option_fixer(&json!([1, 2])).is_err());
    }
}
