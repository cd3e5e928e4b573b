// Test module entry point for sync tests
// End-to-end syncs against an in-memory object store and temp directories


mod dry_run_tests;
mod error_tests;
mod scenario_tests;
mod single_file_tests;
mod upload_tests;
