// store

mod token_cache;

pub use token_cache::*;

// repo

mod user_repo;

pub use user_repo::*;

// time

mod clock;

pub use clock::*;
