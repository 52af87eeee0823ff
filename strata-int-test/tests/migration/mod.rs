mod bootstrap_test;
mod runner_test;
