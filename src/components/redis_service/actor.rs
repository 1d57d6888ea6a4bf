use crate::application::ApplicationAnswer;
use crate::error::{storage_error, AppResult, Error};
use crate::events::models::{Event, EventContent, EventDefaults, EventKey};
use crate::sponsors::{Company, CompanyInput, Tier, TierInput};
use crate::storage::{sort_events, ApplicationStore, EventStore, SponsorStore, UpsertReply};
use async_trait::async_trait;
use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient, Script};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

// Redis key constants
pub mod keys {
    pub const EVENT_DOC_PREFIX: &str = "events:doc:";
    pub const EVENT_GCAL_PREFIX: &str = "events:gcal:";
    pub const EVENT_IDS: &str = "events:ids";
    pub const APPLICATION_PREFIX: &str = "application:";
    pub const SPONSOR_TIERS: &str = "sponsors:tiers";
    pub const SPONSOR_COMPANIES: &str = "sponsors:companies";
}

/// Find-or-create in one round trip.
///
/// KEYS[1] gcal index entry, KEYS[2] id set. ARGV: candidate id, "1" when
/// keyed by gcal uid, document prefix, number of content pairs, the content
/// pairs (always written), then the insert-only pairs.
const UPSERT_EVENT_LUA: &str = r#"
local id = ARGV[1]
if ARGV[2] == '1' then
  local existing = redis.call('GET', KEYS[1])
  if existing then
    id = existing
  else
    redis.call('SET', KEYS[1], id)
  end
end
local doc_key = ARGV[3] .. id
local content_pairs = tonumber(ARGV[4])
local i = 5
for _ = 1, content_pairs do
  redis.call('HSET', doc_key, ARGV[i], ARGV[i + 1])
  i = i + 2
end
while i < #ARGV do
  redis.call('HSETNX', doc_key, ARGV[i], ARGV[i + 1])
  i = i + 2
end
redis.call('SADD', KEYS[2], id)
return redis.call('HGETALL', doc_key)
"#;

lazy_static! {
    static ref UPSERT_EVENT_SCRIPT: Script = Script::new(UPSERT_EVENT_LUA);
}

/// Reply channel carried by each command
pub type Responder<T> = mpsc::Sender<AppResult<T>>;

/// Commands that can be sent to the Redis actor
pub enum RedisCommand {
    UpsertEvent {
        key: EventKey,
        content: EventContent,
        defaults: EventDefaults,
        respond: Responder<UpsertReply>,
    },
    GetEvent(Uuid, Responder<Option<Event>>),
    ListEvents(Responder<Vec<Event>>),
    GetApplication(String, Responder<Vec<ApplicationAnswer>>),
    SaveApplication(String, Vec<ApplicationAnswer>, Responder<()>),
    CreateTier(TierInput, Responder<Tier>),
    ListTiers(Responder<Vec<Tier>>),
    CreateCompany(CompanyInput, Responder<Company>),
    ListCompanies(Responder<Vec<Company>>),
    Shutdown,
}

/// The Redis actor that processes messages
pub struct RedisActor {
    connection: ConnectionManager,
    command_rx: mpsc::Receiver<RedisCommand>,
}

/// Handle for communicating with the Redis actor
#[derive(Clone)]
pub struct RedisActorHandle {
    command_tx: mpsc::Sender<RedisCommand>,
}

impl RedisActorHandle {
    /// Send a command and wait for its reply
    async fn request<T>(
        &self,
        command: impl FnOnce(Responder<T>) -> RedisCommand,
    ) -> AppResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| storage_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(RedisCommand::Shutdown).await;
        Ok(())
    }
}

#[async_trait]
impl EventStore for RedisActorHandle {
    async fn upsert_event(
        &self,
        key: &EventKey,
        content: &EventContent,
        defaults: &EventDefaults,
    ) -> AppResult<UpsertReply> {
        let (key, content, defaults) = (key.clone(), content.clone(), defaults.clone());
        self.request(|respond| RedisCommand::UpsertEvent {
            key,
            content,
            defaults,
            respond,
        })
        .await
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        self.request(|respond| RedisCommand::GetEvent(id, respond)).await
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        self.request(RedisCommand::ListEvents).await
    }
}

#[async_trait]
impl ApplicationStore for RedisActorHandle {
    async fn get_application(&self, user_id: &str) -> AppResult<Vec<ApplicationAnswer>> {
        let user_id = user_id.to_string();
        self.request(|respond| RedisCommand::GetApplication(user_id, respond))
            .await
    }

    async fn save_application(
        &self,
        user_id: &str,
        answers: &[ApplicationAnswer],
    ) -> AppResult<()> {
        let (user_id, answers) = (user_id.to_string(), answers.to_vec());
        self.request(|respond| RedisCommand::SaveApplication(user_id, answers, respond))
            .await
    }
}

#[async_trait]
impl SponsorStore for RedisActorHandle {
    async fn create_tier(&self, input: TierInput) -> AppResult<Tier> {
        self.request(|respond| RedisCommand::CreateTier(input, respond))
            .await
    }

    async fn list_tiers(&self) -> AppResult<Vec<Tier>> {
        self.request(RedisCommand::ListTiers).await
    }

    async fn create_company(&self, input: CompanyInput) -> AppResult<Company> {
        self.request(|respond| RedisCommand::CreateCompany(input, respond))
            .await
    }

    async fn list_companies(&self) -> AppResult<Vec<Company>> {
        self.request(RedisCommand::ListCompanies).await
    }
}

impl RedisActor {
    /// Connect to Redis and return the actor with its handle
    pub async fn connect(redis_url: &str) -> AppResult<(Self, RedisActorHandle)> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))?;

        let (command_tx, command_rx) = mpsc::channel(32);
        let actor = Self {
            connection,
            command_rx,
        };

        Ok((actor, RedisActorHandle { command_tx }))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Redis actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RedisCommand::UpsertEvent {
                    key,
                    content,
                    defaults,
                    respond,
                } => {
                    let result = self.upsert_event(&key, &content, &defaults).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::GetEvent(id, respond) => {
                    let result = self.get_event(id).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::ListEvents(respond) => {
                    let result = self.list_events().await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::GetApplication(user_id, respond) => {
                    let result = self.get_application(&user_id).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::SaveApplication(user_id, answers, respond) => {
                    let result = self.save_application(&user_id, &answers).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::CreateTier(input, respond) => {
                    let result = self.create_tier(input).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::ListTiers(respond) => {
                    let result = self.list_values(keys::SPONSOR_TIERS).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::CreateCompany(input, respond) => {
                    let result = self.create_company(input).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::ListCompanies(respond) => {
                    let result = self.list_values(keys::SPONSOR_COMPANIES).await;
                    let _ = respond.send(result).await;
                }
                RedisCommand::Shutdown => {
                    info!("Redis actor shutting down");
                    break;
                }
            }
        }

        info!("Redis actor shut down");
    }

    async fn upsert_event(
        &self,
        key: &EventKey,
        content: &EventContent,
        defaults: &EventDefaults,
    ) -> AppResult<UpsertReply> {
        let (candidate_id, gcal_index) = match key {
            EventKey::GcalId(uid) => (
                Uuid::new_v4(),
                Some(format!("{}{}", keys::EVENT_GCAL_PREFIX, uid)),
            ),
            EventKey::Id(id) => (*id, None),
        };

        let content_fields = encode_fields(content)?;
        let mut insert_fields = encode_fields(defaults)?;
        insert_fields.push((
            "_id".to_string(),
            Value::from(candidate_id.to_string()).to_string(),
        ));
        if let EventKey::GcalId(uid) = key {
            insert_fields.push(("gcalID".to_string(), Value::from(uid.as_str()).to_string()));
        }

        let mut invocation = UPSERT_EVENT_SCRIPT.prepare_invoke();
        invocation
            .key(gcal_index.as_deref().unwrap_or(keys::EVENT_GCAL_PREFIX))
            .key(keys::EVENT_IDS)
            .arg(candidate_id.to_string())
            .arg(if gcal_index.is_some() { "1" } else { "0" })
            .arg(keys::EVENT_DOC_PREFIX)
            .arg(content_fields.len());
        for (field, value) in content_fields.iter().chain(insert_fields.iter()) {
            invocation.arg(field).arg(value);
        }

        let mut conn = self.connection.clone();
        let reply: Result<HashMap<String, String>, redis::RedisError> =
            invocation.invoke_async(&mut conn).await;

        Ok(upsert_reply(reply.map_err(Error::from)))
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(format!("{}{}", keys::EVENT_DOC_PREFIX, id))
            .await?;
        decode_event(fields)
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let mut conn = self.connection.clone();
        let ids: Vec<String> = conn.smembers(keys::EVENT_IDS).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(format!("{}{}", keys::EVENT_DOC_PREFIX, id));
        }
        let rows: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(event) = decode_event(row)? {
                events.push(event);
            }
        }
        sort_events(&mut events);
        Ok(events)
    }

    async fn get_application(&self, user_id: &str) -> AppResult<Vec<ApplicationAnswer>> {
        let mut conn = self.connection.clone();
        let json: Option<String> = conn
            .get(format!("{}{}", keys::APPLICATION_PREFIX, user_id))
            .await?;

        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_application(
        &self,
        user_id: &str,
        answers: &[ApplicationAnswer],
    ) -> AppResult<()> {
        let json = serde_json::to_string(answers)?;
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(format!("{}{}", keys::APPLICATION_PREFIX, user_id), json)
            .await?;
        Ok(())
    }

    async fn create_tier(&self, input: TierInput) -> AppResult<Tier> {
        let tier = input.into_tier()?;
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(
            keys::SPONSOR_TIERS,
            tier.id.to_string(),
            serde_json::to_string(&tier)?,
        )
        .await?;
        Ok(tier)
    }

    async fn create_company(&self, input: CompanyInput) -> AppResult<Company> {
        let mut conn = self.connection.clone();
        let tier_json: Option<String> = conn
            .hget(keys::SPONSOR_TIERS, input.tier_id.to_string())
            .await?;
        let tier: Tier = match tier_json {
            Some(json) => serde_json::from_str(&json)?,
            None => return Err(Error::NotFound(format!("Tier {}", input.tier_id))),
        };

        let company = input.into_company(tier)?;
        conn.hset::<_, _, _, ()>(
            keys::SPONSOR_COMPANIES,
            company.id.to_string(),
            serde_json::to_string(&company)?,
        )
        .await?;
        Ok(company)
    }

    async fn list_values<T>(&self, key: &str) -> AppResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Named,
    {
        let mut conn = self.connection.clone();
        let values: Vec<String> = conn.hvals(key).await?;

        let mut items = values
            .iter()
            .map(|json| serde_json::from_str(json))
            .collect::<Result<Vec<T>, _>>()?;
        items.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(items)
    }
}

/// Records listed by name
trait Named {
    fn name(&self) -> &str;
}

impl Named for Tier {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Company {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Flatten a record into hash fields with JSON-encoded values
fn encode_fields<T: Serialize>(record: &T) -> AppResult<Vec<(String, String)>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(field, value)| (field, value.to_string()))
            .collect()),
        other => Err(storage_error(&format!("Expected an object, got {}", other))),
    }
}

/// Turn the script outcome into a reply; any failure is reported as not-ok
fn upsert_reply(outcome: AppResult<HashMap<String, String>>) -> UpsertReply {
    match outcome.and_then(decode_event) {
        Ok(value) => UpsertReply {
            value,
            ok: true,
            last_error: None,
        },
        Err(e) => {
            error!("Event upsert failed: {}", e);
            UpsertReply {
                value: None,
                ok: false,
                last_error: Some(serde_json::json!({ "message": e.to_string() })),
            }
        }
    }
}

/// Rebuild an event from its hash fields; an empty hash means no record
fn decode_event(fields: HashMap<String, String>) -> AppResult<Option<Event>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let mut document = Map::new();
    for (field, raw) in fields {
        document.insert(field, serde_json::from_str(&raw)?);
    }

    Ok(Some(serde_json::from_value(Value::Object(document))?))
}
