// Crate-internal.
// ---

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod config_ron_datasource;
        pub(crate) mod education_csv_datasource;
    }
    pub(crate) mod models {
        pub(crate) mod accrual_config_model;
        pub(crate) mod education_status_model;
        pub(crate) mod iso_date_model;
    }
    pub(crate) mod repositories {
        pub(crate) mod in_memory_accrual_repository;
        pub(crate) mod memoized_education_lookup;
    }
}

pub(crate) mod domain {
    pub(crate) mod entities {
        pub(crate) mod accrual_config;
        pub(crate) mod accrual_state;
        pub(crate) mod batch_result;
        pub(crate) mod case;
        pub(crate) mod changeset;
        pub(crate) mod contract;
        pub(crate) mod education;
        pub(crate) mod notification;
        pub(crate) mod period;
        pub(crate) mod posting;
    }
    pub(crate) mod logic {
        pub(crate) mod accrual_math;
        pub(crate) mod case_handlers;
        pub(crate) mod classifier;
        pub(crate) mod resolution_executor;
        pub(crate) mod utils;
    }
    pub(crate) mod repositories {
        pub(crate) mod accrual_repository;
        pub(crate) mod education_lookup;
    }
    pub(crate) mod usecases {
        pub(crate) mod process_month_usecase;
    }
}

pub(crate) mod presentation {
    pub(crate) mod accrual_ledger_printer;
    pub(crate) mod utils;
}

// Public exports.
// ---

#[doc(hidden)]
#[allow(unused_imports)]
pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod entities {
        pub use crate::domain::entities::accrual_config::*;
        pub use crate::domain::entities::accrual_state::*;
        pub use crate::domain::entities::batch_result::*;
        pub use crate::domain::entities::case::*;
        pub use crate::domain::entities::changeset::*;
        pub use crate::domain::entities::contract::*;
        pub use crate::domain::entities::education::*;
        pub use crate::domain::entities::notification::*;
        pub use crate::domain::entities::period::*;
        pub use crate::domain::entities::posting::*;
    }

    pub mod repositories {
        pub use crate::data::repositories::in_memory_accrual_repository::*;
        pub use crate::domain::repositories::accrual_repository::*;
        pub use crate::domain::repositories::education_lookup::*;
    }
}
