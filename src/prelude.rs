//! Exports the standard boosting algorithms, weak learners and traits.
//! 
pub use crate::booster::{
    // Booster trait
    Booster,


    // Classification ---------------------------
    AdaBoost,
    AdaBoostMH,


    // Regression -------------------------------
    L2Boost,


    // Ranking ----------------------------------
    RankingBoost,


    // Boosting objectives ----------------------
    ExponentialLoss,
    MultiClassExponentialLoss,
    SquaredLoss,
};


pub use crate::weak_learner::{
    // Weak learner traits
    WeakLearner,
    WeakObjective,
    BoostingObjective,
    CandidateGenerator,


    // Candidate generators ---------------------
    InputVariables,
    ExhaustiveFunctions,
    RandomFunctions,


    // Learners ---------------------------------
    FiniteLearner,
    SingleStump,
    PolicyLearner,
    CompositeLearner,
    LaminatingLearner,
    BinaryTreeLearner,
};


pub use crate::data_type::{
    Type,
    Value,
    Column,
};


pub use crate::sample::{
    Sample,
    Feature,
};


pub use crate::expression::{
    NodeId,
    NodeKind,
    SequenceKind,
    Function,
};


pub use crate::inference::{
    Task,
    Dataset,
    LuapeInference,
};


pub use crate::index_set::IndexSet;
pub use crate::universe::Universe;
pub use crate::cache::{SamplesCache, InstanceCache, SampleVector};


pub use crate::research::{
    Callback,
    ConsoleCallback,
    RecordingCallback,
    NullCallback,
    EarlyStopping,
    Logger,
    Research,
};


pub use crate::error::{LuapeError, Result};
