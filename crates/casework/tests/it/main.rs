pub(crate) mod common;

mod cases;
mod configuration;
mod lazy;
mod logging;
mod parametrize;
mod unions;
