//! In-memory repository doubles
//!
//! Trait-complete mock repositories for consumers testing against the
//! repository contracts without a database. Enable the `test-utils` feature
//! to use them from another crate:
//!
//! ```toml
//! [dev-dependencies]
//! learnlab-data = { version = "0.4", features = ["test-utils"] }
//! ```
//!
//! The doubles keep rows in `Arc<Mutex<Vec<_>>>`, so clones share state and a
//! mock can be handed to the code under test while the test keeps a handle
//! for assertions. Semantics follow the real adapters (defaults stamped on
//! create, `NotFound` from updates of missing ids, duplicate-pair rejection,
//! get-or-create interaction upserts, counters kept in step) with two
//! documented simplifications: ordering options are ignored (rows come back
//! in insertion order, and `get_random` is insertion-order too) and foreign
//! keys are not simulated.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::entities::{
    CardType, CreateLearningCard, CreatePlan, CreateQuestion, LearningCard,
    LearningCardStatistics, Plan, PlanEnrollment, PlanStatistics, PlanStatus, Question,
    QuestionDifficulty, QuestionFilters, QuestionStatistics, QuestionType, UpdateLearningCard,
    UpdatePlan, UpdateQuestion, UserCardInteraction, DEFAULT_QUESTION_POINTS, MAX_MASTERY_LEVEL,
};
use crate::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::query::{BatchUpdateOutcome, PaginatedResult, PaginationMeta, QueryOptions};
use crate::repository::{LearningCardRepository, PlanRepository, QuestionRepository};

/// Applies the limit/offset window to pre-filtered rows.
fn paginate<T>(rows: Vec<T>, options: Option<&QueryOptions>) -> PaginatedResult<T> {
    let meta = PaginationMeta::compute(rows.len() as u64, options);
    let data = rows
        .into_iter()
        .skip(meta.offset as usize)
        .take(meta.limit as usize)
        .collect();
    PaginatedResult::new(data, meta)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Mirrors the adapters' not-found shape for rows the double cannot find.
fn missing_row(
    entity: &'static str,
    operation: RepositoryOperation,
    id: impl std::fmt::Display,
) -> RepositoryError {
    RepositoryError::not_found(operation, format!("{entity} not found"))
        .with_entity(entity)
        .with_entity_id(id)
}

// ===== MockQuestionRepository =====

/// In-memory [`QuestionRepository`].
#[derive(Clone, Default)]
pub struct MockQuestionRepository {
    rows: Arc<Mutex<Vec<Question>>>,
}

impl MockQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a fully formed row, bypassing the create defaults.
    pub fn seed(&self, question: Question) {
        self.rows.lock().unwrap().push(question);
    }

    fn matching(&self, filters: &QuestionFilters) -> Vec<Question> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|q| question_matches(q, filters))
            .cloned()
            .collect()
    }
}

fn question_from(data: CreateQuestion) -> Question {
    let now = Utc::now();
    Question {
        id: Uuid::new_v4(),
        title: data.title,
        content: data.content,
        category_id: data.category_id,
        topic_id: data.topic_id,
        difficulty: data.difficulty,
        question_type: data.question_type,
        options: data.options,
        correct_answer: data.correct_answer,
        explanation: data.explanation,
        points: data.points.unwrap_or(DEFAULT_QUESTION_POINTS),
        tags: data.tags,
        author_id: data.author_id,
        is_published: data.is_published,
        view_count: 0,
        success_rate: None,
        created_at: now,
        updated_at: now,
    }
}

fn question_matches(question: &Question, filters: &QuestionFilters) -> bool {
    if let Some(category_id) = filters.category_id {
        if question.category_id != Some(category_id) {
            return false;
        }
    }
    if let Some(topic_id) = filters.topic_id {
        if question.topic_id != Some(topic_id) {
            return false;
        }
    }
    if let Some(difficulty) = filters.difficulty {
        if question.difficulty != difficulty {
            return false;
        }
    }
    if let Some(question_type) = filters.question_type {
        if question.question_type != question_type {
            return false;
        }
    }
    if let Some(is_published) = filters.is_published {
        if question.is_published != is_published {
            return false;
        }
    }
    if let Some(author_id) = filters.author_id {
        if question.author_id != Some(author_id) {
            return false;
        }
    }
    if let Some(tag) = &filters.tag {
        if !question.tags.contains(tag) {
            return false;
        }
    }
    if let Some(search) = &filters.search {
        let in_title = contains_ci(&question.title, search);
        let in_content = question
            .content
            .as_deref()
            .is_some_and(|content| contains_ci(content, search));
        if !in_title && !in_content {
            return false;
        }
    }
    true
}

fn apply_question_update(question: &mut Question, data: UpdateQuestion) {
    if let Some(title) = data.title {
        question.title = title;
    }
    if let Some(content) = data.content {
        question.content = Some(content);
    }
    if let Some(category_id) = data.category_id {
        question.category_id = Some(category_id);
    }
    if let Some(topic_id) = data.topic_id {
        question.topic_id = Some(topic_id);
    }
    if let Some(difficulty) = data.difficulty {
        question.difficulty = difficulty;
    }
    if let Some(question_type) = data.question_type {
        question.question_type = question_type;
    }
    if let Some(options) = data.options {
        question.options = options;
    }
    if let Some(correct_answer) = data.correct_answer {
        question.correct_answer = Some(correct_answer);
    }
    if let Some(explanation) = data.explanation {
        question.explanation = Some(explanation);
    }
    if let Some(points) = data.points {
        question.points = points;
    }
    if let Some(tags) = data.tags {
        question.tags = tags;
    }
    if let Some(is_published) = data.is_published {
        question.is_published = is_published;
    }
    question.updated_at = Utc::now();
}

#[async_trait]
impl QuestionRepository for MockQuestionRepository {
    async fn create(&self, data: CreateQuestion) -> RepositoryResult<Question> {
        let question = question_from(data);
        self.rows.lock().unwrap().push(question.clone());
        Ok(question)
    }

    async fn create_batch(&self, data: Vec<CreateQuestion>) -> RepositoryResult<Vec<Question>> {
        let questions: Vec<Question> = data.into_iter().map(question_from).collect();
        self.rows.lock().unwrap().extend(questions.iter().cloned());
        Ok(questions)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Question>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == id)
            .cloned())
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        Ok(paginate(self.matching(&QuestionFilters::none()), options))
    }

    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        let filters = QuestionFilters {
            category_id: Some(category_id),
            ..QuestionFilters::none()
        };
        Ok(paginate(self.matching(&filters), options))
    }

    async fn find_by_topic(
        &self,
        topic_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        let filters = QuestionFilters {
            topic_id: Some(topic_id),
            ..QuestionFilters::none()
        };
        Ok(paginate(self.matching(&filters), options))
    }

    async fn find_by_difficulty(
        &self,
        difficulty: QuestionDifficulty,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        let filters = QuestionFilters {
            difficulty: Some(difficulty),
            ..QuestionFilters::none()
        };
        Ok(paginate(self.matching(&filters), options))
    }

    async fn find_by_type(
        &self,
        question_type: QuestionType,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        let filters = QuestionFilters {
            question_type: Some(question_type),
            ..QuestionFilters::none()
        };
        Ok(paginate(self.matching(&filters), options))
    }

    async fn find_by_filters(
        &self,
        filters: &QuestionFilters,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        Ok(paginate(self.matching(filters), options))
    }

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        let filters = QuestionFilters {
            search: Some(query.to_string()),
            ..QuestionFilters::none()
        };
        Ok(paginate(self.matching(&filters), options))
    }

    async fn count(&self, filters: Option<&QuestionFilters>) -> RepositoryResult<u64> {
        match filters {
            Some(filters) => Ok(self.matching(filters).len() as u64),
            None => Ok(self.rows.lock().unwrap().len() as u64),
        }
    }

    async fn update(&self, id: Uuid, data: UpdateQuestion) -> RepositoryResult<Question> {
        let mut rows = self.rows.lock().unwrap();
        let question = rows
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| missing_row("question", RepositoryOperation::Update, id))?;
        apply_question_update(question, data);
        Ok(question.clone())
    }

    async fn update_batch(
        &self,
        updates: Vec<(Uuid, UpdateQuestion)>,
    ) -> RepositoryResult<BatchUpdateOutcome<Question>> {
        let mut outcome = BatchUpdateOutcome::default();
        for (id, data) in updates {
            match self.update(id, data).await {
                Ok(question) => outcome.push_updated(question),
                Err(error) => outcome.push_failed(id, error),
            }
        }
        Ok(outcome)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepositoryResult<Question> {
        let mut rows = self.rows.lock().unwrap();
        let question = rows
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| missing_row("question", RepositoryOperation::Increment, id))?;
        question.view_count += 1;
        question.updated_at = Utc::now();
        Ok(question.clone())
    }

    async fn update_success_rate(
        &self,
        id: Uuid,
        success_rate: f64,
    ) -> RepositoryResult<Question> {
        if !(0.0..=100.0).contains(&success_rate) {
            return Err(RepositoryError::validation(
                RepositoryOperation::Update,
                format!("success_rate must be within 0..=100, got {success_rate}"),
            )
            .with_entity("question")
            .with_entity_id(id));
        }
        let mut rows = self.rows.lock().unwrap();
        let question = rows
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| missing_row("question", RepositoryOperation::Update, id))?;
        question.success_rate = Some(success_rate);
        question.updated_at = Utc::now();
        Ok(question.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.rows.lock().unwrap().retain(|q| q.id != id);
        Ok(())
    }

    async fn delete_batch(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        self.rows.lock().unwrap().retain(|q| !ids.contains(&q.id));
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> RepositoryResult<Question> {
        let mut rows = self.rows.lock().unwrap();
        let question = rows
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| missing_row("question", RepositoryOperation::SoftDelete, id))?;
        question.is_published = false;
        question.updated_at = Utc::now();
        Ok(question.clone())
    }

    async fn get_statistics(&self) -> RepositoryResult<QuestionStatistics> {
        let rows = self.rows.lock().unwrap();
        let mut by_difficulty = BTreeMap::new();
        for difficulty in QuestionDifficulty::ALL {
            let count = rows.iter().filter(|q| q.difficulty == difficulty).count();
            by_difficulty.insert(difficulty.to_string(), count as u64);
        }
        let mut by_type = BTreeMap::new();
        for question_type in QuestionType::ALL {
            let count = rows
                .iter()
                .filter(|q| q.question_type == question_type)
                .count();
            by_type.insert(question_type.to_string(), count as u64);
        }
        let published = rows.iter().filter(|q| q.is_published).count() as u64;

        Ok(QuestionStatistics {
            total: rows.len() as u64,
            by_difficulty,
            by_type,
            by_category: BTreeMap::new(),
            published,
            unpublished: rows.len() as u64 - published,
            average_success_rate: 0.0,
            total_views: 0,
            last_updated: Utc::now(),
        })
    }

    async fn get_category_statistics(
        &self,
        category_id: Uuid,
    ) -> RepositoryResult<QuestionStatistics> {
        let rows = self.rows.lock().unwrap();
        let total = rows
            .iter()
            .filter(|q| q.category_id == Some(category_id))
            .count() as u64;

        let mut by_category = BTreeMap::new();
        by_category.insert(category_id.to_string(), total);
        let by_difficulty = QuestionDifficulty::ALL
            .iter()
            .map(|d| (d.to_string(), 0))
            .collect();
        let by_type = QuestionType::ALL.iter().map(|t| (t.to_string(), 0)).collect();

        Ok(QuestionStatistics {
            total,
            by_difficulty,
            by_type,
            by_category,
            published: 0,
            unpublished: 0,
            average_success_rate: 0.0,
            total_views: 0,
            last_updated: Utc::now(),
        })
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|q| q.id == id))
    }

    async fn get_random(
        &self,
        count: u32,
        filters: Option<&QuestionFilters>,
    ) -> RepositoryResult<Vec<Question>> {
        let empty = QuestionFilters::none();
        let mut rows = self.matching(filters.unwrap_or(&empty));
        rows.truncate(count as usize);
        Ok(rows)
    }
}

// ===== MockPlanRepository =====

/// In-memory [`PlanRepository`] tracking plans and their enrollments.
///
/// Lock order is plans before enrollments wherever both are needed.
#[derive(Clone, Default)]
pub struct MockPlanRepository {
    plans: Arc<Mutex<Vec<Plan>>>,
    enrollments: Arc<Mutex<Vec<PlanEnrollment>>>,
}

impl MockPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a fully formed plan row.
    pub fn seed_plan(&self, plan: Plan) {
        self.plans.lock().unwrap().push(plan);
    }

    /// Injects a fully formed enrollment row without touching plan counters.
    pub fn seed_enrollment(&self, enrollment: PlanEnrollment) {
        self.enrollments.lock().unwrap().push(enrollment);
    }

    fn page_of_plans(
        &self,
        options: Option<&QueryOptions>,
        predicate: impl Fn(&Plan) -> bool,
    ) -> PaginatedResult<Plan> {
        let rows: Vec<Plan> = self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| predicate(p))
            .cloned()
            .collect();
        paginate(rows, options)
    }

    fn set_status(&self, id: Uuid, status: PlanStatus) -> RepositoryResult<Plan> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing_row("plan", RepositoryOperation::Update, id))?;
        plan.status = status;
        plan.updated_at = Utc::now();
        Ok(plan.clone())
    }
}

fn plan_from(data: CreatePlan) -> Plan {
    let now = Utc::now();
    Plan {
        id: Uuid::new_v4(),
        title: data.title,
        description: data.description,
        category_id: data.category_id,
        status: data.status,
        is_public: data.is_public.unwrap_or(true),
        tags: data.tags,
        author_id: data.author_id,
        estimated_duration_minutes: data.estimated_duration_minutes,
        enrollment_count: 0,
        completion_count: 0,
        average_rating: None,
        created_at: now,
        updated_at: now,
    }
}

fn enrollment_for(plan_id: Uuid, user_id: Uuid) -> PlanEnrollment {
    let now = Utc::now();
    PlanEnrollment {
        id: Uuid::new_v4(),
        plan_id,
        user_id,
        progress: 0.0,
        current_step: 0,
        total_steps: 0,
        is_active: true,
        last_accessed_at: now,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl PlanRepository for MockPlanRepository {
    async fn create(&self, data: CreatePlan) -> RepositoryResult<Plan> {
        let plan = plan_from(data);
        self.plans.lock().unwrap().push(plan.clone());
        Ok(plan)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        Ok(self.page_of_plans(options, |_| true))
    }

    async fn find_published(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        Ok(self.page_of_plans(options, |p| p.status == PlanStatus::Published))
    }

    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        Ok(self.page_of_plans(options, |p| p.category_id == Some(category_id)))
    }

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        Ok(self.page_of_plans(options, |p| {
            contains_ci(&p.title, query)
                || p.description
                    .as_deref()
                    .is_some_and(|description| contains_ci(description, query))
        }))
    }

    async fn update(&self, id: Uuid, data: UpdatePlan) -> RepositoryResult<Plan> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing_row("plan", RepositoryOperation::Update, id))?;
        if let Some(title) = data.title {
            plan.title = title;
        }
        if let Some(description) = data.description {
            plan.description = Some(description);
        }
        if let Some(category_id) = data.category_id {
            plan.category_id = Some(category_id);
        }
        if let Some(status) = data.status {
            plan.status = status;
        }
        if let Some(is_public) = data.is_public {
            plan.is_public = is_public;
        }
        if let Some(tags) = data.tags {
            plan.tags = tags;
        }
        if let Some(estimated) = data.estimated_duration_minutes {
            plan.estimated_duration_minutes = Some(estimated);
        }
        plan.updated_at = Utc::now();
        Ok(plan.clone())
    }

    async fn publish(&self, id: Uuid) -> RepositoryResult<Plan> {
        self.set_status(id, PlanStatus::Published)
    }

    async fn archive(&self, id: Uuid) -> RepositoryResult<Plan> {
        self.set_status(id, PlanStatus::Archived)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.plans.lock().unwrap().retain(|p| p.id != id);
        // The store cascades enrollment rows; the double does it by hand.
        self.enrollments.lock().unwrap().retain(|e| e.plan_id != id);
        Ok(())
    }

    async fn enroll_user(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<PlanEnrollment> {
        let mut plans = self.plans.lock().unwrap();
        // The store reports a missing plan as a foreign-key failure; the
        // double checks directly.
        let plan = plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| missing_row("plan", RepositoryOperation::Enroll, plan_id))?;

        let mut enrollments = self.enrollments.lock().unwrap();
        if enrollments
            .iter()
            .any(|e| e.plan_id == plan_id && e.user_id == user_id)
        {
            return Err(RepositoryError::duplicate(
                RepositoryOperation::Enroll,
                format!("user {user_id} is already enrolled in plan {plan_id}"),
            )
            .with_entity("plan_enrollment"));
        }

        let enrollment = enrollment_for(plan_id, user_id);
        enrollments.push(enrollment.clone());
        plan.enrollment_count += 1;
        plan.updated_at = enrollment.created_at;
        Ok(enrollment)
    }

    async fn unenroll_user(&self, plan_id: Uuid, user_id: Uuid) -> RepositoryResult<()> {
        let mut plans = self.plans.lock().unwrap();
        let mut enrollments = self.enrollments.lock().unwrap();
        let before = enrollments.len();
        enrollments.retain(|e| !(e.plan_id == plan_id && e.user_id == user_id));
        // A missing enrollment is a silent no-op and leaves the counter alone.
        if enrollments.len() < before {
            if let Some(plan) = plans.iter_mut().find(|p| p.id == plan_id) {
                plan.enrollment_count = (plan.enrollment_count - 1).max(0);
                plan.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn get_user_enrollment(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<PlanEnrollment>> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.plan_id == plan_id && e.user_id == user_id)
            .cloned())
    }

    async fn get_user_enrollments(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<PlanEnrollment>> {
        let rows: Vec<PlanEnrollment> = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(rows, options))
    }

    async fn get_plan_enrollments(
        &self,
        plan_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<PlanEnrollment>> {
        let rows: Vec<PlanEnrollment> = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.plan_id == plan_id)
            .cloned()
            .collect();
        Ok(paginate(rows, options))
    }

    async fn update_enrollment_progress(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        progress: f64,
        current_step: Option<i32>,
    ) -> RepositoryResult<PlanEnrollment> {
        if !(0.0..=100.0).contains(&progress) {
            return Err(RepositoryError::validation(
                RepositoryOperation::Update,
                format!("progress must be within 0..=100, got {progress}"),
            )
            .with_entity("plan_enrollment"));
        }
        let mut enrollments = self.enrollments.lock().unwrap();
        let enrollment = enrollments
            .iter_mut()
            .find(|e| e.plan_id == plan_id && e.user_id == user_id)
            .ok_or_else(|| {
                missing_row(
                    "plan_enrollment",
                    RepositoryOperation::Update,
                    format_args!("{plan_id}/{user_id}"),
                )
            })?;
        let now = Utc::now();
        enrollment.progress = progress;
        if let Some(step) = current_step {
            enrollment.current_step = step;
        }
        enrollment.last_accessed_at = now;
        enrollment.updated_at = now;
        Ok(enrollment.clone())
    }

    async fn complete_enrollment(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<PlanEnrollment> {
        let mut plans = self.plans.lock().unwrap();
        let mut enrollments = self.enrollments.lock().unwrap();
        let enrollment = enrollments
            .iter_mut()
            .find(|e| e.plan_id == plan_id && e.user_id == user_id)
            .ok_or_else(|| {
                missing_row(
                    "plan_enrollment",
                    RepositoryOperation::Update,
                    format_args!("{plan_id}/{user_id}"),
                )
            })?;
        // Repeat completions return the existing row without double-counting.
        if enrollment.completed_at.is_none() {
            let now = Utc::now();
            enrollment.progress = 100.0;
            enrollment.completed_at = Some(now);
            enrollment.last_accessed_at = now;
            enrollment.updated_at = now;
            if let Some(plan) = plans.iter_mut().find(|p| p.id == plan_id) {
                plan.completion_count += 1;
                plan.updated_at = now;
            }
        }
        Ok(enrollment.clone())
    }

    async fn is_user_enrolled(&self, plan_id: Uuid, user_id: Uuid) -> RepositoryResult<bool> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.plan_id == plan_id && e.user_id == user_id && e.is_active))
    }

    async fn get_plan_statistics(&self, plan_id: Uuid) -> RepositoryResult<PlanStatistics> {
        let plans = self.plans.lock().unwrap();
        let plan = plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| missing_row("plan", RepositoryOperation::Statistics, plan_id))?;
        let active = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.plan_id == plan_id && e.is_active)
            .count() as u64;

        let completion_rate = if plan.enrollment_count > 0 {
            plan.completion_count as f64 / plan.enrollment_count as f64 * 100.0
        } else {
            0.0
        };

        Ok(PlanStatistics {
            plan_id,
            total_enrollments: plan.enrollment_count,
            active_enrollments: active,
            completions: plan.completion_count,
            completion_rate,
            average_completion_time: 0.0,
            average_rating: plan.average_rating.unwrap_or(0.0),
            total_ratings: 0,
            view_count: 0,
            last_enrollment_at: None,
        })
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.plans.lock().unwrap().len() as u64)
    }

    async fn count_published(&self) -> RepositoryResult<u64> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.status == PlanStatus::Published)
            .count() as u64)
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.plans.lock().unwrap().iter().any(|p| p.id == id))
    }
}

// ===== MockLearningCardRepository =====

/// In-memory [`LearningCardRepository`] tracking cards and per-user
/// interactions.
///
/// Lock order is cards before interactions wherever both are needed.
#[derive(Clone, Default)]
pub struct MockLearningCardRepository {
    cards: Arc<Mutex<Vec<LearningCard>>>,
    interactions: Arc<Mutex<Vec<UserCardInteraction>>>,
}

impl MockLearningCardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a fully formed card row.
    pub fn seed_card(&self, card: LearningCard) {
        self.cards.lock().unwrap().push(card);
    }

    /// Injects a fully formed interaction row.
    pub fn seed_interaction(&self, interaction: UserCardInteraction) {
        self.interactions.lock().unwrap().push(interaction);
    }

    fn page_of_cards(
        &self,
        options: Option<&QueryOptions>,
        predicate: impl Fn(&LearningCard) -> bool,
    ) -> PaginatedResult<LearningCard> {
        let rows: Vec<LearningCard> = self
            .cards
            .lock()
            .unwrap()
            .iter()
            .filter(|c| predicate(c))
            .cloned()
            .collect();
        paginate(rows, options)
    }

    fn bump_counter(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut LearningCard),
    ) -> RepositoryResult<LearningCard> {
        let mut cards = self.cards.lock().unwrap();
        let card = cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| missing_row("learning_card", RepositoryOperation::Increment, id))?;
        apply(card);
        card.updated_at = Utc::now();
        Ok(card.clone())
    }

    /// Get-or-create for the `(card_id, user_id)` pair, then `mutate` on the
    /// row. The first touch creates the row with inert defaults.
    fn upsert_interaction(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        mutate: impl FnOnce(&mut UserCardInteraction),
    ) -> UserCardInteraction {
        let mut interactions = self.interactions.lock().unwrap();
        let position = match interactions
            .iter()
            .position(|i| i.card_id == card_id && i.user_id == user_id)
        {
            Some(position) => position,
            None => {
                interactions.push(interaction_for(card_id, user_id));
                interactions.len() - 1
            }
        };
        let interaction = &mut interactions[position];
        mutate(interaction);
        interaction.updated_at = Utc::now();
        interaction.clone()
    }
}

fn card_from(data: CreateLearningCard) -> LearningCard {
    let now = Utc::now();
    LearningCard {
        id: Uuid::new_v4(),
        title: data.title,
        content: data.content,
        category_id: data.category_id,
        topic_id: data.topic_id,
        card_type: data.card_type,
        difficulty: data.difficulty,
        tags: data.tags,
        related_cards: data.related_cards,
        display_order: data.display_order,
        is_published: data.is_published,
        view_count: 0,
        like_count: 0,
        author_id: data.author_id,
        created_at: now,
        updated_at: now,
    }
}

fn interaction_for(card_id: Uuid, user_id: Uuid) -> UserCardInteraction {
    let now = Utc::now();
    UserCardInteraction {
        id: Uuid::new_v4(),
        card_id,
        user_id,
        mastery_level: 0,
        review_count: 0,
        is_bookmarked: false,
        notes: None,
        viewed_at: None,
        last_reviewed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl LearningCardRepository for MockLearningCardRepository {
    async fn create(&self, data: CreateLearningCard) -> RepositoryResult<LearningCard> {
        let card = card_from(data);
        self.cards.lock().unwrap().push(card.clone());
        Ok(card)
    }

    async fn create_batch(
        &self,
        data: Vec<CreateLearningCard>,
    ) -> RepositoryResult<Vec<LearningCard>> {
        let cards: Vec<LearningCard> = data.into_iter().map(card_from).collect();
        self.cards.lock().unwrap().extend(cards.iter().cloned());
        Ok(cards)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<LearningCard>> {
        Ok(self
            .cards
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        Ok(self.page_of_cards(options, |_| true))
    }

    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        Ok(self.page_of_cards(options, |c| c.category_id == Some(category_id)))
    }

    async fn find_by_topic(
        &self,
        topic_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        Ok(self.page_of_cards(options, |c| c.topic_id == Some(topic_id)))
    }

    async fn find_by_type(
        &self,
        card_type: CardType,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        Ok(self.page_of_cards(options, |c| c.card_type == card_type))
    }

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        Ok(self.page_of_cards(options, |c| {
            contains_ci(&c.title, query) || contains_ci(&c.content, query)
        }))
    }

    async fn find_related_cards(
        &self,
        card_id: Uuid,
        limit: Option<u32>,
    ) -> RepositoryResult<Vec<LearningCard>> {
        let cards = self.cards.lock().unwrap();
        let card = cards
            .iter()
            .find(|c| c.id == card_id)
            .ok_or_else(|| missing_row("learning_card", RepositoryOperation::FindById, card_id))?
            .clone();
        let limit = limit.unwrap_or(5) as usize;

        let related: Vec<LearningCard> = if !card.related_cards.is_empty() {
            cards
                .iter()
                .filter(|c| c.id != card_id && card.related_cards.contains(&c.id))
                .take(limit)
                .cloned()
                .collect()
        } else if card.topic_id.is_some() {
            cards
                .iter()
                .filter(|c| c.id != card_id && c.topic_id == card.topic_id)
                .take(limit)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        Ok(related)
    }

    async fn update(&self, id: Uuid, data: UpdateLearningCard) -> RepositoryResult<LearningCard> {
        let mut cards = self.cards.lock().unwrap();
        let card = cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| missing_row("learning_card", RepositoryOperation::Update, id))?;
        if let Some(title) = data.title {
            card.title = title;
        }
        if let Some(content) = data.content {
            card.content = content;
        }
        if let Some(category_id) = data.category_id {
            card.category_id = Some(category_id);
        }
        if let Some(topic_id) = data.topic_id {
            card.topic_id = Some(topic_id);
        }
        if let Some(card_type) = data.card_type {
            card.card_type = card_type;
        }
        if let Some(difficulty) = data.difficulty {
            card.difficulty = Some(difficulty);
        }
        if let Some(tags) = data.tags {
            card.tags = tags;
        }
        if let Some(related_cards) = data.related_cards {
            card.related_cards = related_cards;
        }
        if let Some(display_order) = data.display_order {
            card.display_order = display_order;
        }
        if let Some(is_published) = data.is_published {
            card.is_published = is_published;
        }
        card.updated_at = Utc::now();
        Ok(card.clone())
    }

    async fn increment_view_count(&self, id: Uuid) -> RepositoryResult<LearningCard> {
        self.bump_counter(id, |card| card.view_count += 1)
    }

    async fn increment_like_count(&self, id: Uuid) -> RepositoryResult<LearningCard> {
        self.bump_counter(id, |card| card.like_count += 1)
    }

    async fn decrement_like_count(&self, id: Uuid) -> RepositoryResult<LearningCard> {
        self.bump_counter(id, |card| card.like_count = (card.like_count - 1).max(0))
    }

    async fn record_view(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<UserCardInteraction> {
        {
            let mut cards = self.cards.lock().unwrap();
            let card = cards
                .iter_mut()
                .find(|c| c.id == card_id)
                .ok_or_else(|| missing_row("learning_card", RepositoryOperation::Upsert, card_id))?;
            card.view_count += 1;
            card.updated_at = Utc::now();
        }
        Ok(self.upsert_interaction(card_id, user_id, |interaction| {
            interaction.review_count += 1;
            interaction.viewed_at = Some(Utc::now());
        }))
    }

    async fn record_mastery(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        level: i16,
    ) -> RepositoryResult<UserCardInteraction> {
        if !(0..=MAX_MASTERY_LEVEL).contains(&level) {
            return Err(RepositoryError::validation(
                RepositoryOperation::Upsert,
                format!("mastery level must be within 0..={MAX_MASTERY_LEVEL}, got {level}"),
            )
            .with_entity("user_card_interaction"));
        }
        Ok(self.upsert_interaction(card_id, user_id, |interaction| {
            interaction.mastery_level = level;
            interaction.last_reviewed_at = Some(Utc::now());
        }))
    }

    async fn toggle_bookmark(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<UserCardInteraction> {
        Ok(self.upsert_interaction(card_id, user_id, |interaction| {
            // A freshly created row flips false -> true, so the first touch
            // bookmarks.
            interaction.is_bookmarked = !interaction.is_bookmarked;
        }))
    }

    async fn update_notes(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        notes: &str,
    ) -> RepositoryResult<UserCardInteraction> {
        Ok(self.upsert_interaction(card_id, user_id, |interaction| {
            interaction.notes = Some(notes.to_string());
        }))
    }

    async fn get_user_interaction(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<UserCardInteraction>> {
        Ok(self
            .interactions
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.card_id == card_id && i.user_id == user_id)
            .cloned())
    }

    async fn get_user_interactions(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<UserCardInteraction>> {
        let rows: Vec<UserCardInteraction> = self
            .interactions
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(rows, options))
    }

    async fn get_user_bookmarks(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        let cards = self.cards.lock().unwrap();
        let bookmarked: Vec<Uuid> = self
            .interactions
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && i.is_bookmarked)
            .map(|i| i.card_id)
            .collect();
        if bookmarked.is_empty() {
            return Ok(PaginatedResult::empty(options));
        }
        let rows: Vec<LearningCard> = cards
            .iter()
            .filter(|c| bookmarked.contains(&c.id))
            .cloned()
            .collect();
        Ok(paginate(rows, options))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.cards.lock().unwrap().retain(|c| c.id != id);
        self.interactions.lock().unwrap().retain(|i| i.card_id != id);
        Ok(())
    }

    async fn delete_batch(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        self.cards.lock().unwrap().retain(|c| !ids.contains(&c.id));
        self.interactions
            .lock()
            .unwrap()
            .retain(|i| !ids.contains(&i.card_id));
        Ok(())
    }

    async fn get_statistics(&self) -> RepositoryResult<LearningCardStatistics> {
        let cards = self.cards.lock().unwrap();
        let mut by_type = BTreeMap::new();
        for card_type in CardType::ALL {
            let count = cards.iter().filter(|c| c.card_type == card_type).count();
            by_type.insert(card_type.to_string(), count as u64);
        }
        let published = cards.iter().filter(|c| c.is_published).count() as u64;

        Ok(LearningCardStatistics {
            total: cards.len() as u64,
            by_type,
            by_category: BTreeMap::new(),
            by_difficulty: BTreeMap::new(),
            published,
            unpublished: cards.len() as u64 - published,
            total_views: 0,
            total_likes: 0,
            average_mastery_level: 0.0,
        })
    }

    async fn get_category_statistics(
        &self,
        category_id: Uuid,
    ) -> RepositoryResult<LearningCardStatistics> {
        let cards = self.cards.lock().unwrap();
        let total = cards
            .iter()
            .filter(|c| c.category_id == Some(category_id))
            .count() as u64;

        let mut by_category = BTreeMap::new();
        by_category.insert(category_id.to_string(), total);
        let by_type = CardType::ALL.iter().map(|t| (t.to_string(), 0)).collect();

        Ok(LearningCardStatistics {
            total,
            by_type,
            by_category,
            by_difficulty: BTreeMap::new(),
            published: 0,
            unpublished: 0,
            total_views: 0,
            total_likes: 0,
            average_mastery_level: 0.0,
        })
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.cards.lock().unwrap().len() as u64)
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(self.cards.lock().unwrap().iter().any(|c| c.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn easy_question(category_id: Uuid) -> CreateQuestion {
        CreateQuestion {
            title: "T".to_string(),
            correct_answer: Some("Paris".to_string()),
            options: vec!["London".to_string(), "Paris".to_string()],
            difficulty: QuestionDifficulty::Easy,
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn question_crud_round_trip() {
        let repo = MockQuestionRepository::new();
        let created = repo.create(easy_question(Uuid::new_v4())).await.unwrap();

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "T");
        assert_eq!(found.view_count, 0);
        assert!(!found.is_published);
        assert_eq!(found.points, DEFAULT_QUESTION_POINTS);
        assert_eq!(found.correct_answer.as_deref(), Some("Paris"));

        let updated = repo
            .update(
                created.id,
                UpdateQuestion {
                    difficulty: Some(QuestionDifficulty::Hard),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.difficulty, QuestionDifficulty::Hard);
        // An absent field is left untouched by a partial update.
        assert_eq!(updated.title, "T");

        repo.delete(created.id).await.unwrap();
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_ids_read_as_none_everywhere() {
        let missing = Uuid::new_v4();
        assert_eq!(
            MockQuestionRepository::new()
                .find_by_id(missing)
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            MockPlanRepository::new().find_by_id(missing).await.unwrap(),
            None
        );
        assert_eq!(
            MockLearningCardRepository::new()
                .find_by_id(missing)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn filtered_pagination_counts_only_matches() {
        let repo = MockQuestionRepository::new();
        let category_id = Uuid::new_v4();

        repo.create(easy_question(category_id)).await.unwrap();
        repo.create(CreateQuestion {
            difficulty: QuestionDifficulty::Hard,
            ..easy_question(category_id)
        })
        .await
        .unwrap();

        let filters = QuestionFilters {
            category_id: Some(category_id),
            difficulty: Some(QuestionDifficulty::Easy),
            ..QuestionFilters::none()
        };
        let options = QueryOptions::new().with_limit(10);
        let page = repo
            .find_by_filters(&filters, Some(&options))
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.meta.total, 1);
        assert!(!page.meta.has_more);
        assert_eq!(page.data[0].difficulty, QuestionDifficulty::Easy);
    }

    #[tokio::test]
    async fn pagination_windows_never_exceed_the_limit() {
        let repo = MockQuestionRepository::new();
        for _ in 0..5 {
            repo.create(easy_question(Uuid::new_v4())).await.unwrap();
        }

        let options = QueryOptions::new().with_limit(2).with_offset(4);
        let page = repo.find_all(Some(&options)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.meta.total, 5);
        assert!(!page.meta.has_more);

        let first = QueryOptions::new().with_limit(2);
        let page = repo.find_all(Some(&first)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.meta.has_more);
    }

    #[tokio::test]
    async fn soft_delete_is_idempotent() {
        let repo = MockQuestionRepository::new();
        let created = repo
            .create(CreateQuestion {
                is_published: true,
                ..easy_question(Uuid::new_v4())
            })
            .await
            .unwrap();
        assert!(created.is_published);

        let first = repo.soft_delete(created.id).await.unwrap();
        assert!(!first.is_published);
        let second = repo.soft_delete(created.id).await.unwrap();
        assert!(!second.is_published);
        // The row survives both calls.
        assert!(repo.exists(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_batch_reports_per_item_outcomes() {
        let repo = MockQuestionRepository::new();
        let created = repo.create(easy_question(Uuid::new_v4())).await.unwrap();
        let missing = Uuid::new_v4();

        let outcome = repo
            .update_batch(vec![
                (
                    created.id,
                    UpdateQuestion {
                        points: Some(25),
                        ..Default::default()
                    },
                ),
                (missing, UpdateQuestion::default()),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.updated[0].points, 25);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, missing);
        assert!(outcome.failed[0].error.is_not_found());
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn record_view_keeps_one_row_per_pair() {
        let repo = MockLearningCardRepository::new();
        let card = repo
            .create(CreateLearningCard {
                title: "Borrowing".to_string(),
                content: "Shared xor mutable.".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();

        for _ in 0..3 {
            repo.record_view(card.id, user_id).await.unwrap();
        }

        let interaction = repo
            .get_user_interaction(card.id, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(interaction.review_count, 3);
        assert!(interaction.viewed_at.is_some());

        let interactions = repo.get_user_interactions(user_id, None).await.unwrap();
        assert_eq!(interactions.meta.total, 1);

        let viewed = repo.find_by_id(card.id).await.unwrap().unwrap();
        assert_eq!(viewed.view_count, 3);
    }

    #[tokio::test]
    async fn first_bookmark_toggle_bookmarks() {
        let repo = MockLearningCardRepository::new();
        let card = repo
            .create(CreateLearningCard {
                title: "Lifetimes".to_string(),
                content: "Names for borrow regions.".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();

        let first = repo.toggle_bookmark(card.id, user_id).await.unwrap();
        assert!(first.is_bookmarked);
        let bookmarks = repo.get_user_bookmarks(user_id, None).await.unwrap();
        assert_eq!(bookmarks.len(), 1);

        let second = repo.toggle_bookmark(card.id, user_id).await.unwrap();
        assert!(!second.is_bookmarked);
        assert_eq!(first.id, second.id);
        let bookmarks = repo.get_user_bookmarks(user_id, None).await.unwrap();
        assert!(bookmarks.is_empty());
    }

    #[tokio::test]
    async fn mastery_level_is_range_checked() {
        let repo = MockLearningCardRepository::new();
        let card_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let err = repo
            .record_mastery(card_id, user_id, MAX_MASTERY_LEVEL + 1)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let interaction = repo.record_mastery(card_id, user_id, 4).await.unwrap();
        assert_eq!(interaction.mastery_level, 4);
        assert!(interaction.last_reviewed_at.is_some());
    }

    #[tokio::test]
    async fn enrollment_lifecycle_keeps_counters_in_step() {
        let repo = MockPlanRepository::new();
        let plan = repo
            .create(CreatePlan {
                title: "Rust in four weeks".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();

        repo.enroll_user(plan.id, user_id).await.unwrap();
        assert!(repo.is_user_enrolled(plan.id, user_id).await.unwrap());
        assert_eq!(
            repo.find_by_id(plan.id).await.unwrap().unwrap().enrollment_count,
            1
        );

        // The pair is unique.
        let err = repo.enroll_user(plan.id, user_id).await.unwrap_err();
        assert!(err.is_duplicate());

        repo.unenroll_user(plan.id, user_id).await.unwrap();
        assert!(!repo.is_user_enrolled(plan.id, user_id).await.unwrap());
        assert_eq!(
            repo.find_by_id(plan.id).await.unwrap().unwrap().enrollment_count,
            0
        );

        // Unenrolling again is a silent no-op and the counter stays floored.
        repo.unenroll_user(plan.id, user_id).await.unwrap();
        assert_eq!(
            repo.find_by_id(plan.id).await.unwrap().unwrap().enrollment_count,
            0
        );

        // Re-enrollment starts from fresh defaults.
        let again = repo.enroll_user(plan.id, user_id).await.unwrap();
        assert_eq!(again.progress, 0.0);
        assert_eq!(again.completed_at, None);
    }

    #[tokio::test]
    async fn repeat_completion_does_not_double_count() {
        let repo = MockPlanRepository::new();
        let plan = repo
            .create(CreatePlan {
                title: "Async Rust".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();
        repo.enroll_user(plan.id, user_id).await.unwrap();

        let completed = repo.complete_enrollment(plan.id, user_id).await.unwrap();
        assert_eq!(completed.progress, 100.0);
        assert!(completed.completed_at.is_some());

        let repeated = repo.complete_enrollment(plan.id, user_id).await.unwrap();
        assert_eq!(repeated.completed_at, completed.completed_at);

        let stats = repo.get_plan_statistics(plan.id).await.unwrap();
        assert_eq!(stats.completions, 1);
        assert_eq!(stats.total_enrollments, 1);
        assert_eq!(stats.completion_rate, 100.0);
    }

    #[tokio::test]
    async fn progress_updates_validate_and_require_the_pair() {
        let repo = MockPlanRepository::new();
        let plan = repo
            .create(CreatePlan {
                title: "Ownership deep dive".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();

        let err = repo
            .update_enrollment_progress(plan.id, user_id, 50.0, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        repo.enroll_user(plan.id, user_id).await.unwrap();
        let err = repo
            .update_enrollment_progress(plan.id, user_id, 120.0, None)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let updated = repo
            .update_enrollment_progress(plan.id, user_id, 50.0, Some(3))
            .await
            .unwrap();
        assert_eq!(updated.progress, 50.0);
        assert_eq!(updated.current_step, 3);
    }

    #[tokio::test]
    async fn related_cards_prefer_the_curated_list() {
        let repo = MockLearningCardRepository::new();
        let topic_id = Uuid::new_v4();
        let neighbor = repo
            .create(CreateLearningCard {
                title: "Neighbor".to_string(),
                content: "same topic".to_string(),
                topic_id: Some(topic_id),
                ..Default::default()
            })
            .await
            .unwrap();
        let curated = repo
            .create(CreateLearningCard {
                title: "Curated".to_string(),
                content: "explicitly linked".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let card = repo
            .create(CreateLearningCard {
                title: "Subject".to_string(),
                content: "card under test".to_string(),
                topic_id: Some(topic_id),
                related_cards: vec![curated.id],
                ..Default::default()
            })
            .await
            .unwrap();

        let related = repo.find_related_cards(card.id, None).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, curated.id);

        // Without a curated list, relatedness falls back to the topic.
        let fallback = repo.find_related_cards(neighbor.id, None).await.unwrap();
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].id, card.id);

        let err = repo
            .find_related_cards(Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn statistics_reflect_the_seeded_corpus() {
        let repo = MockQuestionRepository::new();
        repo.create(CreateQuestion {
            is_published: true,
            ..easy_question(Uuid::new_v4())
        })
        .await
        .unwrap();
        repo.create(CreateQuestion {
            difficulty: QuestionDifficulty::Hard,
            question_type: QuestionType::Code,
            ..easy_question(Uuid::new_v4())
        })
        .await
        .unwrap();

        let stats = repo.get_statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.unpublished, 1);
        assert_eq!(stats.by_difficulty["easy"], 1);
        assert_eq!(stats.by_difficulty["hard"], 1);
        assert_eq!(stats.by_difficulty["expert"], 0);
        assert_eq!(stats.by_type["code"], 1);
        // Documented as not yet computed.
        assert!(stats.by_category.is_empty());
        assert_eq!(stats.total_views, 0);
    }
}
