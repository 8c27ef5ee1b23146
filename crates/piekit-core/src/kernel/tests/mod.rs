pub mod mailbox_tests;
