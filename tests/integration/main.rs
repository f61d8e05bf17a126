//! End-to-end tests: decision policy, session engine and orchestrator
//! against an in-memory game service and a scripted session server.

mod end_to_end;
mod mock_game;
mod scripted_session;
