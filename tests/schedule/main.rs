mod concurrency;
mod import;
mod scenarios;
mod support;
mod timeslots;
