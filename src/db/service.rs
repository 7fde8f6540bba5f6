use log::*;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::time::delay_for;

use tokio_postgres::{
  connect, Client, Statement, Row, NoTls,
  error::SqlState,
  types::ToSql,
};

use crate::error::*;

use super::PgCommentStore;

const MAX_RETRIES: u32 = 10;

pub type RefClient = Rc<(u64, Client)>;

/// Client connected state
#[derive(Clone)]
enum ClientState {
  Connecting(u64),
  Connected(RefClient),
}

/// A postgres client shared by all statements of one `DbService`.
///
/// A background task owns the connection and reconnects when it drops,
/// bumping the version so statements know to prepare again.  The task
/// only holds a weak reference: once the last `SharedClient` is dropped
/// the client is closed, the connection future finishes and the task ends.
#[derive(Clone)]
pub struct SharedClient {
  state: Rc<RefCell<ClientState>>,
}

impl SharedClient {
  pub fn new(url: &str) -> Self {
    let shared_cl = Self {
      state: Rc::new(RefCell::new(ClientState::Connecting(0))),
    };
    let weak = Rc::downgrade(&shared_cl.state);
    let url = url.to_string();
    actix_rt::spawn(async move {
      run_connection(weak, url).await;
      debug!("client background task stopped.");
    });
    shared_cl
  }

  pub async fn get_client(&self) -> Result<RefClient> {
    let mut retries = 0u32;
    loop {
      let state = self.state.borrow().clone();
      match state {
        ClientState::Connected(cl) => return Ok(cl),
        ClientState::Connecting(version) => {
          debug!("get_client: ver={}: Connecting..", version);
        },
      }
      retries += 1;
      if retries >= MAX_RETRIES {
        return Err(Error::DisconnectedError("Failed to connect to database".to_string()));
      }
      delay_for(Duration::from_millis(100)).await;
    }
  }
}

async fn run_connection(state: Weak<RefCell<ClientState>>, url: String) {
  let mut version = 0u64;
  loop {
    version += 1;
    match state.upgrade() {
      Some(state) => state.replace(ClientState::Connecting(version)),
      None => return,
    };
    debug!("client task: ver={}: Connecting", version);
    let (cl, conn) = match connect(&url, NoTls).await {
      Ok(pair) => pair,
      Err(err) => {
        debug!("client task: ver={}: connect error: {}", version, err);
        delay_for(Duration::from_millis(500)).await;
        continue;
      },
    };
    match state.upgrade() {
      Some(state) => state.replace(ClientState::Connected(Rc::new((version, cl)))),
      None => return,
    };
    debug!("client task: ver={}: Connected", version);
    if let Err(err) = conn.await {
      debug!("client task: ver={}: connection error: {}", version, err);
    }
    if state.upgrade().is_none() {
      // all handles dropped, the client went with them.
      return;
    }
    delay_for(Duration::from_millis(500)).await;
  }
}

struct ClientStatement {
  cl: RefClient,
  statement: Statement,
}

/// A query prepared lazily against the current client version.
///
/// Preparing is retried across reconnects, running a query is not: a
/// statement that fails mid-flight may already have been applied, so the
/// error goes back to the caller.
pub struct PreparedQuery {
  shared_cl: SharedClient,
  prepared: RefCell<Option<Rc<ClientStatement>>>,
  query: String,
}

macro_rules! impl_query_method {
  ($method:ident, $res_ty:ty) => {
    pub async fn $method(&self, params: &[&(dyn ToSql + Sync)]) -> Result<$res_ty> {
      let prepared = self.statement().await?;
      prepared.cl.1.$method(&prepared.statement, params).await
        .map_err(|err| self.query_error(err))
    }
  };
}

impl PreparedQuery {
  pub fn new(shared_cl: &SharedClient, query: &str) -> Self {
    Self {
      shared_cl: shared_cl.clone(),
      prepared: RefCell::new(None),
      query: query.to_string(),
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.statement().await?;
    Ok(())
  }

  async fn statement(&self) -> Result<Rc<ClientStatement>> {
    let mut retries = 0u32;
    loop {
      let cl = self.shared_cl.get_client().await?;
      let cached = self.prepared.borrow().clone();
      if let Some(prepared) = cached {
        if prepared.cl.0 == cl.0 {
          return Ok(prepared);
        }
        debug!("statement: ver={} is stale, client ver={}", prepared.cl.0, cl.0);
      }
      match cl.1.prepare(&self.query).await {
        Ok(statement) => {
          let prepared = Rc::new(ClientStatement { cl, statement });
          self.prepared.replace(Some(prepared.clone()));
          return Ok(prepared);
        },
        Err(err) if err.code().is_none() && err.to_string() == "connection closed" => {
          retries += 1;
          if retries >= MAX_RETRIES {
            return Err(Error::DisconnectedError("Failed to connect to database".to_string()));
          }
          info!("DB connection closed while preparing, retry.");
          delay_for(Duration::from_millis(100)).await;
        },
        Err(err) => return Err(self.query_error(err)),
      }
    }
  }

  fn query_error(&self, err: tokio_postgres::Error) -> Error {
    match err.code().cloned() {
      Some(code) if code == SqlState::UNIQUE_VIOLATION || code == SqlState::FOREIGN_KEY_VIOLATION => {
        debug!("Postgres integrity error: {}, query=[[{}]]", err, self.query);
        Error::Conflict(err.to_string())
      },
      Some(_) => {
        error!("Postgres DB error: {:?}, query=[[{}]]", err, self.query);
        err.into()
      },
      None => {
        error!("Postgres error: {}, query=[[{}]]", err, self.query);
        Error::DisconnectedError(err.to_string())
      },
    }
  }

  impl_query_method!(query, Vec<Row>);
  impl_query_method!(query_one, Row);
  impl_query_method!(query_opt, Option<Row>);
  impl_query_method!(execute, u64);
}

/// Per-worker database session: one shared client plus the prepared
/// statements of the stores built on it.
#[derive(Clone)]
pub struct DbService {
  pub shared_cl: SharedClient,
  pub comments: Rc<PgCommentStore>,
}

impl DbService {
  pub fn new(db_url: &str) -> DbService {
    let shared_cl = SharedClient::new(db_url);

    DbService {
      comments: Rc::new(PgCommentStore::new(&shared_cl)),
      shared_cl,
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    info!("DBService: Prepare CommentStore.");
    self.comments.prepare().await?;

    info!("DBService: finished.");
    Ok(())
  }
}
