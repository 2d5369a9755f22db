use std::{collections::HashMap, sync::Arc};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc, Weekday};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// Grids produced per `/generate` call.
pub const GRIDS_PER_GENERATION: usize = 4;
/// Upper bound on grids returned by `/grids`.
pub const GRID_LIST_LIMIT: usize = 20;

const NUMBER_POOL: usize = 15;
const STAR_POOL: usize = 6;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Draw {
    pub id: i64,
    pub date: NaiveDate,
    pub numbers: Vec<u32>,
    pub stars: Vec<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid {
    pub id: i64,
    pub draw_date: NaiveDate,
    pub numbers: Vec<u32>,
    pub stars: Vec<u32>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewGrid {
    pub draw_date: NaiveDate,
    pub numbers: Vec<u32>,
    pub stars: Vec<u32>,
}

/// In-memory stand-in for the backend's database.
#[derive(Debug, Default)]
pub struct Backend {
    draws: Vec<Draw>,
    grids: Vec<Grid>,
    outage: Option<String>,
}

pub type Db = Arc<RwLock<Backend>>;

type ApiResult<T> = Result<T, (StatusCode, String)>;

impl Backend {
    pub fn with_draws(mut self, draws: Vec<Draw>) -> Self {
        self.draws = draws;
        self
    }

    /// Seed stored grids, oldest first.
    pub fn with_grids(mut self, grids: Vec<Grid>) -> Self {
        self.grids = grids;
        self
    }

    /// Answer every endpoint with `500 <message>`.
    pub fn with_outage(mut self, message: impl Into<String>) -> Self {
        self.outage = Some(message.into());
        self
    }

    fn check_outage(&self) -> ApiResult<()> {
        match &self.outage {
            Some(message) => Err((StatusCode::INTERNAL_SERVER_ERROR, message.clone())),
            None => Ok(()),
        }
    }

    fn next_grid_id(&self) -> i64 {
        self.grids.iter().map(|g| g.id).max().unwrap_or(0) + 1
    }

    /// Generate and store a batch of grids for the draw after `today`.
    pub fn generate(&mut self, today: NaiveDate, now: NaiveDateTime) -> Vec<NewGrid> {
        let draw_date = next_draw_date(today);
        let numbers = candidate_pool(self.draws.iter().map(|d| &d.numbers), NUMBER_POOL, 5, 50);
        let stars = candidate_pool(self.draws.iter().map(|d| &d.stars), STAR_POOL, 2, 12);

        let mut rng = rand::thread_rng();
        let mut pick = |pool: &[u32], count: usize| {
            let mut picked: Vec<u32> = pool.choose_multiple(&mut rng, count).copied().collect();
            picked.sort_unstable();
            picked
        };

        let batch: Vec<NewGrid> = (0..GRIDS_PER_GENERATION)
            .map(|_| NewGrid {
                draw_date,
                numbers: pick(&numbers, 5),
                stars: pick(&stars, 2),
            })
            .collect();

        for grid in &batch {
            let id = self.next_grid_id();
            self.grids.push(Grid {
                id,
                draw_date: grid.draw_date,
                numbers: grid.numbers.clone(),
                stars: grid.stars.clone(),
                created_at: Some(now),
            });
        }
        batch
    }

    /// Most recent first; grids without `created_at` come last.
    pub fn recent_grids(&self) -> Vec<Grid> {
        let mut grids: Vec<Grid> = self.grids.iter().rev().cloned().collect();
        grids.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        grids.truncate(GRID_LIST_LIMIT);
        grids
    }
}

/// The next Tuesday or Friday strictly after `today`.
pub fn next_draw_date(today: NaiveDate) -> NaiveDate {
    today
        .iter_days()
        .skip(1)
        .find(|d| matches!(d.weekday(), Weekday::Tue | Weekday::Fri))
        .unwrap_or(today)
}

/// The `size` most frequent values across `history`, or `1..=max` when the
/// history cannot fill a grid.
fn candidate_pool<'a>(
    history: impl Iterator<Item = &'a Vec<u32>>,
    size: usize,
    needed: usize,
    max: u32,
) -> Vec<u32> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for value in history.flatten() {
        *counts.entry(*value).or_default() += 1;
    }

    let mut ranked: Vec<(u32, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let pool: Vec<u32> = ranked.into_iter().take(size).map(|(v, _)| v).collect();

    if pool.len() >= needed {
        pool
    } else {
        (1..=max).collect()
    }
}

pub fn app() -> Router {
    app_with(Backend::default())
}

pub fn app_with(backend: Backend) -> Router {
    let db: Db = Arc::new(RwLock::new(backend));
    Router::new()
        .route("/", get(index))
        .route("/history", get(get_history))
        .route("/generate", get(generate_grids))
        .route("/grids", get(list_grids))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Backend::default()).await
}

pub async fn run_with(listener: TcpListener, backend: Backend) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(backend)).await
}

async fn index() -> &'static str {
    "Euromillions Bot API is running"
}

async fn get_history(State(db): State<Db>) -> ApiResult<String> {
    let backend = db.read().await;
    backend.check_outage()?;
    tracing::info!(draws = backend.draws.len(), "history refreshed");
    Ok(format!(
        "History fetched. Processed {} draws.",
        backend.draws.len()
    ))
}

async fn generate_grids(State(db): State<Db>) -> ApiResult<Json<Vec<NewGrid>>> {
    let mut backend = db.write().await;
    backend.check_outage()?;
    let now = Utc::now().naive_utc();
    let batch = backend.generate(now.date(), now);
    tracing::info!(count = batch.len(), "generated grids");
    Ok(Json(batch))
}

async fn list_grids(State(db): State<Db>) -> ApiResult<Json<Vec<Grid>>> {
    let backend = db.read().await;
    backend.check_outage()?;
    Ok(Json(backend.recent_grids()))
}
