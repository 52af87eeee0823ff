mod collection_builder_test;
