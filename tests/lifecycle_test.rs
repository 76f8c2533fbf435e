use async_trait::async_trait;
use serde_json::{json, Value};
use soar_sync::client::{AccountScope, Scope, XsoarApi};
use soar_sync::error::Result;
use soar_sync::schema::{
    ModuleCatalog, ModuleDefinition, ModuleInstanceRequest, RemoteAccount, RemoteInstance, RemoteParameter,
};
use soar_sync::{InstanceReconciler, IntegrationInstance, ReadOutcome, ReconcileError};
use std::sync::{Arc, Mutex};

/// In-memory platform that records every call it receives.
#[derive(Default)]
struct FakeApi {
    modules: Vec<ModuleDefinition>,
    accounts: Vec<AccountScope>,
    instances: Mutex<Vec<(Scope, RemoteInstance)>>,
    writes: Mutex<Vec<(Scope, Value)>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeApi {
    fn with_slack() -> Self {
        let slack = ModuleDefinition::from_value(json!({
            "name": "Slack",
            "category": "Messaging",
            "canGetSamples": true,
            "integrationScript": {"type": "python"},
            "configuration": [
                {"name": "url", "display": "Server URL", "defaultValue": "https://slack.com", "type": 0},
                {"name": "token", "display": "API Token", "defaultValue": "", "type": 4},
                {"name": "proxy", "display": "Use system proxy", "defaultValue": "false", "type": 8}
            ]
        }))
        .unwrap();
        Self {
            modules: vec![slack],
            accounts: vec![AccountScope::for_account("teamA")],
            ..Default::default()
        }
    }

    fn seed(&self, scope: Scope, instance: RemoteInstance) {
        self.instances.lock().unwrap().push((scope, instance));
    }

    fn find(&self, scope: &Scope, pred: impl Fn(&RemoteInstance) -> bool) -> Option<RemoteInstance> {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .find(|(s, i)| s == scope && pred(i))
            .map(|(_, i)| i.clone())
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn last_write(&self) -> (Scope, Value) {
        self.writes.lock().unwrap().last().cloned().expect("no write recorded")
    }
}

#[async_trait]
impl XsoarApi for FakeApi {
    async fn list_modules(&self) -> Result<ModuleCatalog> {
        self.record("list_modules");
        Ok(ModuleCatalog::new(self.modules.clone()))
    }

    async fn get_instance_by_id(&self, scope: &Scope, id: &str) -> Result<Option<RemoteInstance>> {
        self.record("get_instance_by_id");
        Ok(self.find(scope, |i| i.id == id))
    }

    async fn get_instance_by_name(&self, scope: &Scope, name: &str) -> Result<Option<RemoteInstance>> {
        self.record("get_instance_by_name");
        Ok(self.find(scope, |i| i.name == name))
    }

    async fn get_account(&self, account: &AccountScope) -> Result<Option<RemoteAccount>> {
        self.record("get_account");
        Ok(self.accounts.contains(account).then(|| RemoteAccount {
            id: Some(account.as_str().to_string()),
            name: Some(account.as_str().to_string()),
        }))
    }

    async fn upsert_instance(&self, scope: &Scope, payload: &ModuleInstanceRequest) -> Result<RemoteInstance> {
        self.record("upsert_instance");
        self.writes
            .lock()
            .unwrap()
            .push((scope.clone(), serde_json::to_value(payload).unwrap()));

        let mut instances = self.instances.lock().unwrap();
        let id = payload.id.clone().unwrap_or_else(|| format!("id-{}", instances.len() + 1));
        let remote = RemoteInstance {
            id: id.clone(),
            name: payload.name.clone(),
            brand: payload.brand.clone(),
            enabled: Some(payload.enabled.clone()),
            propagation_labels: payload.propagation_labels.clone(),
            data: payload
                .data
                .iter()
                .filter(|p| p.has_value)
                .map(|p| RemoteParameter {
                    name: Some(p.parameter.name.clone()),
                    value: p.value.clone().unwrap_or(Value::Null),
                })
                .collect(),
            incoming_mapper_id: Some(payload.incoming_mapper_id.clone()),
            mapping_id: Some(payload.mapping_id.clone()),
            engine: Some(payload.engine.clone()),
        };
        instances.retain(|(s, i)| !(s == scope && i.id == id));
        instances.push((scope.clone(), remote.clone()));
        Ok(remote)
    }

    async fn delete_instance(&self, scope: &Scope, id: &str) -> Result<()> {
        self.record("delete_instance");
        self.instances.lock().unwrap().retain(|(s, i)| !(s == scope && i.id == id));
        Ok(())
    }
}

fn reconciler(api: &Arc<FakeApi>) -> InstanceReconciler {
    InstanceReconciler::new(api.clone())
}

fn remote(id: &str, name: &str) -> RemoteInstance {
    RemoteInstance {
        id: id.to_string(),
        name: name.to_string(),
        brand: "Slack".to_string(),
        enabled: Some("true".to_string()),
        propagation_labels: vec![],
        data: vec![RemoteParameter { name: Some("url".into()), value: json!("https://x") }],
        incoming_mapper_id: None,
        mapping_id: None,
        engine: None,
    }
}

#[tokio::test]
async fn create_then_read_round_trips_plain_config() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("myslack", "Slack").with_config(r#"{"token":"abc"}"#);

    let created = engine.create(&plan).await.unwrap();
    assert_eq!(created.id.as_deref(), Some("id-1"));
    assert_eq!(created.config_json.as_deref(), Some(r#"{"token":"abc"}"#));

    let (_, wire) = api.last_write();
    let token = &wire["data"][1];
    assert_eq!(token["name"], "token");
    assert_eq!(token["value"], "abc");
    assert_eq!(token["hasvalue"], true);
    assert_eq!(wire["data"][0]["hasvalue"], false);
    assert!(wire["data"][0].get("value").is_none());

    match engine.read(&created).await.unwrap() {
        ReadOutcome::Present(read) => {
            assert_eq!(read.config_json.as_deref(), Some(r#"{"token":"abc"}"#));
            assert_eq!(read, created);
        }
        ReadOutcome::Absent => panic!("instance should still exist"),
    }
}

#[tokio::test]
async fn secrets_stay_out_of_config_snapshot() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("myslack", "Slack")
        .with_config(r#"{"url":"https://x"}"#)
        .with_secrets(r#"{"token":"y"}"#);

    let created = engine.create(&plan).await.unwrap();
    assert_eq!(created.config_json.as_deref(), Some(r#"{"url":"https://x"}"#));
    assert_eq!(created.secret_config_json.as_deref(), Some(r#"{"token":"y"}"#));

    // the secret was still sent to the platform
    let (_, wire) = api.last_write();
    assert_eq!(wire["data"][1]["value"], "y");

    let ReadOutcome::Present(read) = engine.read(&created).await.unwrap() else {
        panic!("instance should still exist");
    };
    assert_eq!(read.config_json.as_deref(), Some(r#"{"url":"https://x"}"#));
    assert_eq!(read.secret_config_json.as_deref(), Some(r#"{"token":"y"}"#));
}

#[tokio::test]
async fn key_collision_makes_no_remote_call() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("myslack", "Slack")
        .with_config(r#"{"token":"x"}"#)
        .with_secrets(r#"{"token":"y"}"#);

    match engine.create(&plan).await {
        Err(ReconcileError::KeyCollision { key }) => assert_eq!(key, "token"),
        other => panic!("expected KeyCollision, got {:?}", other),
    }

    let mut state = plan.clone();
    state.id = Some("id-1".into());
    assert!(matches!(
        engine.update(&plan, &state).await,
        Err(ReconcileError::KeyCollision { .. })
    ));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn enabled_is_sent_as_string() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);

    engine.create(&IntegrationInstance::new("a", "Slack")).await.unwrap();
    assert_eq!(api.last_write().1["enabled"], "true");

    let disabled = IntegrationInstance { enabled: Some(false), ..IntegrationInstance::new("b", "Slack") };
    let created = engine.create(&disabled).await.unwrap();
    assert_eq!(api.last_write().1["enabled"], "false");
    assert_eq!(created.enabled, Some(false));
}

#[tokio::test]
async fn update_reuses_id_and_fills_defaults() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("myslack", "Slack").with_config(r#"{"API Token":"abc"}"#);
    let created = engine.create(&plan).await.unwrap();

    let planned = IntegrationInstance::new("myslack", "Slack").with_config(r#"{"token":"def"}"#);
    let updated = engine.update(&planned, &created).await.unwrap();
    assert_eq!(updated.id, created.id);

    let (_, wire) = api.last_write();
    assert_eq!(wire["id"], "id-1");
    assert_eq!(wire["version"], -1);
    assert_eq!(wire["data"][0]["value"], "https://slack.com");
    assert_eq!(wire["data"][0]["hasvalue"], false);
    assert_eq!(wire["data"][2]["value"], "false");
    assert_eq!(wire["data"][1]["value"], "def");
    assert_eq!(api.instances.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_module_fails_before_writing() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let err = engine
        .create(&IntegrationInstance::new("x", "NoSuchModule"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ModuleNotFound { ref name } if name == "NoSuchModule"));
    assert!(!api.calls().contains(&"upsert_instance"));
}

#[tokio::test]
async fn unknown_config_keys_are_dropped() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("x", "Slack").with_config(r#"{"url":"https://x","colour":"red"}"#);
    let created = engine.create(&plan).await.unwrap();
    assert_eq!(created.config_json.as_deref(), Some(r#"{"url":"https://x"}"#));
}

#[tokio::test]
async fn scoped_read_with_missing_account_removes_state() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let mut state = IntegrationInstance::new("myslack", "Slack").with_account("teamGone");
    state.id = Some("id-9".into());

    assert_eq!(engine.read(&state).await.unwrap(), ReadOutcome::Absent);
    assert_eq!(api.calls(), vec!["get_account"]);
}

#[tokio::test]
async fn read_of_vanished_instance_removes_state() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let mut state = IntegrationInstance::new("myslack", "Slack");
    state.id = Some("id-9".into());
    assert_eq!(engine.read(&state).await.unwrap(), ReadOutcome::Absent);
}

#[tokio::test]
async fn account_scoped_create_routes_to_account() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("myslack", "Slack").with_account("teamA");

    let created = engine.create(&plan).await.unwrap();
    assert_eq!(created.account.as_deref(), Some("teamA"));
    let (scope, _) = api.last_write();
    assert_eq!(scope, Scope::Account(AccountScope::for_account("teamA")));

    let ReadOutcome::Present(read) = engine.read(&created).await.unwrap() else {
        panic!("instance should exist in teamA");
    };
    assert_eq!(read.account.as_deref(), Some("teamA"));

    engine.delete(&created).await.unwrap();
    assert!(api.instances.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_adopts_an_orphaned_instance_with_the_same_name() {
    let api = Arc::new(FakeApi::with_slack());
    api.seed(Scope::Global, remote("existing-7", "myslack"));
    let engine = reconciler(&api);

    let created = engine
        .create(&IntegrationInstance::new("myslack", "Slack"))
        .await
        .unwrap();
    assert_eq!(created.id.as_deref(), Some("existing-7"));
    assert_eq!(api.last_write().1["id"], "existing-7");
    assert_eq!(api.instances.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn create_does_not_adopt_an_instance_whose_id_matches_the_name() {
    let api = Arc::new(FakeApi::with_slack());
    api.seed(Scope::Global, remote("prod", "someone-elses-instance"));
    let engine = reconciler(&api);

    let created = engine.create(&IntegrationInstance::new("prod", "Slack")).await.unwrap();
    assert_ne!(created.id.as_deref(), Some("prod"));
    assert!(api.last_write().1.get("id").is_none());

    let instances = api.instances.lock().unwrap();
    assert_eq!(instances.len(), 2);
    assert!(instances.iter().any(|(_, i)| i.id == "prod" && i.name == "someone-elses-instance"));
}

#[tokio::test]
async fn read_by_id_ignores_an_instance_named_like_the_id() {
    let api = Arc::new(FakeApi::with_slack());
    api.seed(Scope::Global, remote("other-3", "id-9"));
    let engine = reconciler(&api);
    let mut state = IntegrationInstance::new("myslack", "Slack");
    state.id = Some("id-9".into());

    assert_eq!(engine.read(&state).await.unwrap(), ReadOutcome::Absent);
}

#[tokio::test]
async fn update_refuses_to_move_accounts_or_modules() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let plan = IntegrationInstance::new("myslack", "Slack").with_account("teamA");
    let created = engine.create(&plan).await.unwrap();
    let writes_before = api.writes.lock().unwrap().len();

    let moved = plan.clone().with_account("teamB");
    assert!(matches!(
        engine.update(&moved, &created).await,
        Err(ReconcileError::Precondition(_))
    ));
    let rebranded = IntegrationInstance { integration_name: "Mail".into(), ..plan.clone() };
    assert!(matches!(
        engine.update(&rebranded, &created).await,
        Err(ReconcileError::Precondition(_))
    ));
    assert_eq!(api.writes.lock().unwrap().len(), writes_before);

    let updated = engine.update(&plan.with_config(r#"{"url":"https://y"}"#), &created).await.unwrap();
    assert_eq!(updated.account.as_deref(), Some("teamA"));
    assert_eq!(api.last_write().0, Scope::Account(AccountScope::for_account("teamA")));
    let ReadOutcome::Present(read) = engine.read(&updated).await.unwrap() else {
        panic!("instance should still exist in teamA");
    };
    assert_eq!(read.config_json.as_deref(), Some(r#"{"url":"https://y"}"#));
}

#[tokio::test]
async fn create_refuses_a_caller_supplied_id() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    let mut plan = IntegrationInstance::new("myslack", "Slack");
    plan.id = Some("1".into());
    assert!(matches!(engine.create(&plan).await, Err(ReconcileError::Precondition(_))));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn import_seeds_empty_secrets() {
    let api = Arc::new(FakeApi::with_slack());
    api.seed(Scope::Account(AccountScope::for_account("teamA")), remote("5", "myslack"));
    api.seed(Scope::Global, remote("6", "global-slack"));
    let engine = reconciler(&api);

    let imported = engine.import("teamA.myslack").await.unwrap();
    assert_eq!(imported.account.as_deref(), Some("teamA"));
    assert_eq!(imported.id.as_deref(), Some("5"));
    assert_eq!(imported.secret_config_json.as_deref(), Some("{}"));
    assert_eq!(imported.config_json.as_deref(), Some(r#"{"url":"https://x"}"#));
    assert_eq!(imported.enabled, Some(true));

    let imported = engine.import("global-slack").await.unwrap();
    assert_eq!(imported.account, None);
    assert_eq!(imported.id.as_deref(), Some("6"));
}

#[tokio::test]
async fn import_of_missing_instance_is_an_error() {
    let api = Arc::new(FakeApi::with_slack());
    let engine = reconciler(&api);
    match engine.import("teamA.nothing").await {
        Err(ReconcileError::ImportNotFound { name }) => assert_eq!(name, "nothing"),
        other => panic!("expected ImportNotFound, got {:?}", other),
    }
}
