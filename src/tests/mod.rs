// Tests module
// Walk engine: bootstrap, commit, rollback, and event-race tests
