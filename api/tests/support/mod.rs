pub(crate) mod test_app;
