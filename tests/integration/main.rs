mod build_tests;
mod manifest_tests;
mod support;
