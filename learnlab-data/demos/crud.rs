//! Question CRUD Walkthrough
//!
//! Wires configuration, factory, and provider together, then runs one
//! create/read/update/list/delete cycle against the question repository.
//!
//! Needs a reachable PostgreSQL with `schema.sql` applied:
//!
//! ```sh
//! export LEARNLAB_DATABASE_URL=postgres://localhost:5432/learnlab
//! export LEARNLAB_DATABASE_KEY=dev-anon-key
//! cargo run --example crud
//! ```

use std::sync::Arc;

use learnlab_data::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,learnlab_data=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Defaults, then LEARNLAB_DATABASE_* variables on top.
    let config = RepositoryFactoryConfig::from_env()?;
    info!(kind = %config.kind, "configuration loaded");

    // Construction never dials the database; the first query below does.
    let factory = Arc::new(RepositoryFactory::new(config));
    let provider = RepositoryProvider::new(factory);
    let questions = provider.questions()?;

    // Create a draft question. Unset fields take the documented defaults,
    // so this one lands with 10 points and a zero view count.
    let created = questions
        .create(CreateQuestion {
            title: "What does the ? operator do in Rust?".to_string(),
            content: Some("Pick the best description.".to_string()),
            difficulty: QuestionDifficulty::Easy,
            question_type: QuestionType::MultipleChoice,
            options: vec![
                "Propagates errors to the caller".to_string(),
                "Panics when the value is an Err".to_string(),
                "Silently discards errors".to_string(),
            ],
            correct_answer: Some("Propagates errors to the caller".to_string()),
            tags: vec!["error-handling".to_string(), "basics".to_string()],
            ..Default::default()
        })
        .await?;
    info!(id = %created.id, points = created.points, "created question");

    // Read it back by id.
    let fetched = questions.find_by_id(created.id).await?;
    info!(found = fetched.is_some(), "fetched by id");

    // Publish it and raise the stakes.
    let published = questions
        .update(
            created.id,
            UpdateQuestion {
                is_published: Some(true),
                points: Some(25),
                ..Default::default()
            },
        )
        .await?;
    info!(
        points = published.points,
        is_published = published.is_published,
        "published question"
    );

    // List the first page of published easy questions.
    let filters = QuestionFilters {
        difficulty: Some(QuestionDifficulty::Easy),
        is_published: Some(true),
        ..QuestionFilters::none()
    };
    let page = questions
        .find_by_filters(&filters, Some(&QueryOptions::page(1, 10)))
        .await?;
    info!(
        rows = page.len(),
        total = page.meta.total,
        has_more = page.meta.has_more,
        "listed published easy questions"
    );

    // Clean up.
    questions.delete(created.id).await?;
    let gone = questions.find_by_id(created.id).await?;
    info!(deleted = gone.is_none(), "removed question");

    Ok(())
}
