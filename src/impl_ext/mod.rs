// Crate-internal.
// ---

pub(crate) mod standard_lookups {
    pub(crate) mod snapshot_lookup;
    pub(crate) mod static_lookup;
}

// Public exports.
// ---

pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod standard_lookups {
        pub use crate::impl_ext::standard_lookups::snapshot_lookup::*;
        pub use crate::impl_ext::standard_lookups::static_lookup::*;
    }
}
