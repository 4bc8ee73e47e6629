use clap::{Parser, Subcommand};
use flf::model::entity::{
    Course, CourseCreate, Module, ModuleCreate, Quiz, QuizCreate, QuizQuestion, QuizQuestionCreate,
    UserEntity, UserEntityCreateUpdate,
};
use flf::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use flf::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling the learning DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage course modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage quizzes and their questions
    Quiz {
        #[command(subcommand)]
        action: QuizCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// `user` or `admin`
        #[arg(long, default_value = "user")]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "beginner")]
        level: String,
        #[arg(long, default_value_t = 0)]
        credits: i32,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        /// Course title to attach the module to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with module content
        #[arg(long)]
        file: String,
        /// Appended after the last module when omitted
        #[arg(long)]
        module_order: Option<i32>,
        #[arg(long)]
        duration_minutes: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum QuizCommands {
    Add {
        /// Course title to attach the quiz to
        #[arg(long)]
        course_title: String,
        /// Module title; passing the quiz completes this module
        #[arg(long)]
        module_title: Option<String>,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        passing_score: Option<i32>,
        #[arg(long)]
        time_limit_minutes: Option<i32>,
    },
    AddQuestion {
        /// Quiz title to attach the question to
        #[arg(long)]
        quiz_title: String,
        #[arg(long)]
        question: String,
        /// Repeat once per option, in display order
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Zero-based index into the options
        #[arg(long)]
        correct_answer: i32,
        #[arg(long, default_value = "")]
        explanation: String,
        #[arg(long)]
        question_order: Option<i32>,
    },
}

async fn id_by_title(mm: &ModelManager, table: &str, title: &str) -> Result<uuid::Uuid, DatabaseError> {
    let id = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE title = $1"))
        .bind(title)
        .fetch_one(mm.executor())
        .await?;
    Ok(id)
}

#[tokio::main]
async fn main() -> flf::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        eprintln!("DATABASE_URL is not set");
        std::process::exit(1);
    });
    let mm = ModelManager::new(DbConnection::connect(&database_url)?);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                email,
                password,
                role,
            } => {
                let user = UserEntity::create_with_role(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        email,
                        password_hash: flf::auth::hash_password(&password)?,
                        first_name: None,
                        last_name: None,
                    },
                    UserRole::from(role.as_str()),
                )
                .await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                title,
                description,
                level,
                credits,
                order_index,
            } => {
                let course = Course::create(
                    &mm,
                    &actor,
                    CourseCreate {
                        title,
                        description,
                        level: Some(level),
                        credits,
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add {
                course_title,
                title,
                file,
                module_order,
                duration_minutes,
            } => {
                let course_id = id_by_title(&mm, "courses", &course_title).await?;
                let content = std::fs::read_to_string(file)?;

                let module = Module::create(
                    &mm,
                    &actor,
                    ModuleCreate {
                        course_id,
                        title,
                        content,
                        module_order,
                        duration_minutes,
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Quiz { action } => match action {
            QuizCommands::Add {
                course_title,
                module_title,
                title,
                description,
                passing_score,
                time_limit_minutes,
            } => {
                let course_id = id_by_title(&mm, "courses", &course_title).await?;
                let module_id = match module_title {
                    Some(t) => Some(id_by_title(&mm, "modules", &t).await?),
                    None => None,
                };

                let quiz = Quiz::create(
                    &mm,
                    &actor,
                    QuizCreate {
                        course_id,
                        module_id,
                        title,
                        description,
                        passing_score,
                        time_limit_minutes,
                    },
                )
                .await?;
                println!("Quiz created: {:?}", quiz);
            }

            QuizCommands::AddQuestion {
                quiz_title,
                question,
                options,
                correct_answer,
                explanation,
                question_order,
            } => {
                let quiz_id = id_by_title(&mm, "quizzes", &quiz_title).await?;
                let data = QuizQuestionCreate {
                    quiz_id,
                    question,
                    options,
                    correct_answer,
                    explanation,
                    question_order,
                };
                if !data.answer_in_range() {
                    eprintln!("--correct-answer must index one of the options");
                    std::process::exit(2);
                }

                let question = QuizQuestion::create(&mm, &actor, data).await?;
                println!("Question created: {:?}", question);
            }
        },
    }

    Ok(())
}
