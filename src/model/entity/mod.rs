mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod refresh_token;
pub use refresh_token::{RefreshToken, RefreshTokenCreate};

mod course;
pub use course::{Course, CourseCreate, CourseWithProgressRow};

mod module;
pub use module::{Module, ModuleCreate, ModuleWithProgressRow};

mod user_progress;
pub use user_progress::{ProgressSummary, ScoreMerge, UserProgress, UserProgressUpsert};

mod quiz;
pub use quiz::{DEFAULT_PASSING_SCORE, Quiz, QuizCreate};

mod quiz_question;
pub use quiz_question::{QuizQuestion, QuizQuestionCreate};

mod quiz_result;
pub use quiz_result::{BestScore, QuizResult, QuizStatistics};

mod portfolio;
pub use portfolio::{OrderExecution, OrderRequest, Portfolio};

mod position;
pub use position::Position;

mod trade;
pub use trade::Trade;

mod watchlist;
pub use watchlist::WatchlistItem;
