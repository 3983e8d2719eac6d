// Test modules for the chat widget
// Each module exercises one source module; `helpers` holds shared doubles

mod helpers;

mod conversation_tests;
mod lifecycle_tests;
mod store_tests;
