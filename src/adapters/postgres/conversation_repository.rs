//! PostgreSQL implementation of ConversationRepository.
//!
//! Persists conversation shells, question records and messages. Message
//! order within a question is kept in an explicit `position` column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::conversation::{Author, Conversation, Message, NewMessage};
use crate::domain::foundation::{
    ConversationId, InterviewId, MessageId, QuestionId, Timestamp,
};
use crate::ports::{ConversationRecord, ConversationRepository, QuestionRecord, RepositoryError};

/// SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of ConversationRepository.
#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    /// Creates a new PostgresConversationRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn exists_for_interview(&self, interview_id: InterviewId) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE interview_id = $1) AS present",
        )
        .bind(interview_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check conversation existence", e))?;

        row.try_get("present")
            .map_err(|e| db_error("Failed to read existence flag", e))
    }

    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationId, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO conversations (interview_id, created_at, updated_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(conversation.interview_id().value())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error("Failed to insert conversation", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| db_error("Failed to read conversation id", e))?;
        Ok(ConversationId::new(id))
    }

    async fn create_question(
        &self,
        conversation: &Conversation,
        topic_number: u32,
        question_number: u32,
        prompt: &str,
    ) -> Result<QuestionId, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let row = sqlx::query(
            r#"
            INSERT INTO questions (conversation_id, topic_number, question_number, prompt)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(conversation.id().value())
        .bind(to_db_number("topic_number", topic_number)?)
        .bind(to_db_number("question_number", question_number)?)
        .bind(prompt)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| insert_error("Failed to insert question", e))?;

        touch_conversation(&mut tx, conversation.id()).await?;

        tx.commit().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to commit transaction: {}", e))
        })?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| db_error("Failed to read question id", e))?;
        Ok(QuestionId::new(id))
    }

    async fn create_messages(
        &self,
        conversation: &Conversation,
        question_id: QuestionId,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let mut position = lock_question(&mut tx, question_id).await?.next_position;
        let mut ids = Vec::with_capacity(messages.len());

        for message in messages {
            let row = sqlx::query(
                r#"
                INSERT INTO messages (question_id, position, author, content, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(question_id.value())
            .bind(position)
            .bind(message.author.as_str())
            .bind(&message.content)
            .bind(message.created_at.as_datetime())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| insert_error("Failed to insert message", e))?;

            let id: i64 = row
                .try_get("id")
                .map_err(|e| db_error("Failed to read message id", e))?;
            ids.push(MessageId::new(id));
            position += 1;
        }

        touch_conversation(&mut tx, conversation.id()).await?;

        tx.commit().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(ids)
    }

    async fn add_message(
        &self,
        question_id: QuestionId,
        message: &NewMessage,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to start transaction: {}", e))
        })?;

        // Holds the question row lock until commit, serializing appends.
        let locked = lock_question(&mut tx, question_id).await?;
        let created_at = match locked.last_created_at {
            Some(last) => Timestamp::now().not_before(Timestamp::from_datetime(last)),
            None => Timestamp::now(),
        };

        let row = sqlx::query(
            r#"
            INSERT INTO messages (question_id, position, author, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(question_id.value())
        .bind(locked.next_position)
        .bind(message.author.as_str())
        .bind(&message.content)
        .bind(created_at.as_datetime())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| insert_error("Failed to insert message", e))?;

        touch_conversation(&mut tx, locked.conversation_id).await?;

        tx.commit().await.map_err(|e| {
            RepositoryError::Database(format!("Failed to commit transaction: {}", e))
        })?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| db_error("Failed to read message id", e))?;

        Ok(Message::reconstitute(
            MessageId::new(id),
            question_id,
            message.author,
            message.content.clone(),
            created_at,
        ))
    }

    async fn get_conversation(
        &self,
        interview_id: InterviewId,
    ) -> Result<ConversationRecord, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, interview_id, created_at, updated_at
            FROM conversations
            WHERE interview_id = $1
            "#,
        )
        .bind(interview_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch conversation", e))?
        .ok_or_else(|| {
            RepositoryError::not_found(format!("conversation for interview {}", interview_id))
        })?;

        conversation_from_row(&row)
    }

    async fn get_question(
        &self,
        conversation_id: ConversationId,
    ) -> Result<QuestionRecord, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, conversation_id, topic_number, question_number, prompt, created_at
            FROM questions
            WHERE conversation_id = $1
            ORDER BY topic_number ASC, question_number ASC
            LIMIT 1
            "#,
        )
        .bind(conversation_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch question", e))?
        .ok_or_else(|| {
            RepositoryError::not_found(format!("question for conversation {}", conversation_id))
        })?;

        question_from_row(&row)
    }

    async fn get_messages(&self, question_id: QuestionId) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, question_id, author, content, created_at
            FROM messages
            WHERE question_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(question_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch messages", e))?;

        rows.iter().map(message_from_row).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════════

/// State of a question read under its row lock.
struct LockedQuestion {
    conversation_id: ConversationId,
    next_position: i32,
    last_created_at: Option<DateTime<Utc>>,
}

/// Locks the question row for the rest of the transaction.
async fn lock_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    question_id: QuestionId,
) -> Result<LockedQuestion, RepositoryError> {
    let question = sqlx::query("SELECT conversation_id FROM questions WHERE id = $1 FOR UPDATE")
        .bind(question_id.value())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to lock question", e))?
        .ok_or_else(|| RepositoryError::not_found(format!("question {}", question_id)))?;

    let tail = sqlx::query(
        r#"
        SELECT COALESCE(MAX(position), 0) + 1 AS next_position, MAX(created_at) AS last_created_at
        FROM messages
        WHERE question_id = $1
        "#,
    )
    .bind(question_id.value())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to read message tail", e))?;

    let conversation_id: i64 = question
        .try_get("conversation_id")
        .map_err(|e| db_error("Failed to read conversation id", e))?;

    Ok(LockedQuestion {
        conversation_id: ConversationId::new(conversation_id),
        next_position: tail
            .try_get("next_position")
            .map_err(|e| db_error("Failed to read next position", e))?,
        last_created_at: tail
            .try_get("last_created_at")
            .map_err(|e| db_error("Failed to read last timestamp", e))?,
    })
}

async fn touch_conversation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: ConversationId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        UPDATE conversations SET updated_at = GREATEST(updated_at, NOW())
        WHERE id = $1
        "#,
    )
    .bind(conversation_id.value())
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to update conversation timestamp", e))?;
    Ok(())
}

fn conversation_from_row(row: &PgRow) -> Result<ConversationRecord, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| db_error("Failed to read id", e))?;
    let interview_id: i64 = row
        .try_get("interview_id")
        .map_err(|e| db_error("Failed to read interview_id", e))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| db_error("Failed to read created_at", e))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| db_error("Failed to read updated_at", e))?;

    Ok(ConversationRecord {
        id: ConversationId::new(id),
        interview_id: InterviewId::new(interview_id),
        created_at: Timestamp::from_datetime(created_at),
        updated_at: Timestamp::from_datetime(updated_at),
    })
}

fn question_from_row(row: &PgRow) -> Result<QuestionRecord, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| db_error("Failed to read id", e))?;
    let conversation_id: i64 = row
        .try_get("conversation_id")
        .map_err(|e| db_error("Failed to read conversation_id", e))?;
    let topic_number: i32 = row
        .try_get("topic_number")
        .map_err(|e| db_error("Failed to read topic_number", e))?;
    let question_number: i32 = row
        .try_get("question_number")
        .map_err(|e| db_error("Failed to read question_number", e))?;
    let prompt: String = row
        .try_get("prompt")
        .map_err(|e| db_error("Failed to read prompt", e))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| db_error("Failed to read created_at", e))?;

    Ok(QuestionRecord {
        id: QuestionId::new(id),
        conversation_id: ConversationId::new(conversation_id),
        topic_number: from_db_number("topic_number", topic_number)?,
        question_number: from_db_number("question_number", question_number)?,
        prompt,
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| db_error("Failed to read id", e))?;
    let question_id: i64 = row
        .try_get("question_id")
        .map_err(|e| db_error("Failed to read question_id", e))?;
    let author: String = row
        .try_get("author")
        .map_err(|e| db_error("Failed to read author", e))?;
    let content: String = row
        .try_get("content")
        .map_err(|e| db_error("Failed to read content", e))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| db_error("Failed to read created_at", e))?;

    Ok(Message::reconstitute(
        MessageId::new(id),
        QuestionId::new(question_id),
        str_to_author(&author)?,
        content,
        Timestamp::from_datetime(created_at),
    ))
}

fn str_to_author(value: &str) -> Result<Author, RepositoryError> {
    value
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("Unknown author: {}", value)))
}

fn to_db_number(field: &str, value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{} out of range: {}", field, value)))
}

fn from_db_number(field: &str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{} out of range: {}", field, value)))
}

fn db_error(context: &str, e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(format!("{}: {}", context, e))
}

/// Like [`db_error`], but unique violations become `Conflict`.
fn insert_error(context: &str, e: sqlx::Error) -> RepositoryError {
    let unique_violation = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);

    if unique_violation {
        RepositoryError::Conflict(format!("{}: {}", context, e))
    } else {
        db_error(context, e)
    }
}
